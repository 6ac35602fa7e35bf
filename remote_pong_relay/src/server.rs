// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts connections
//   and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per connection): call `framing::read_message()` in
//   a loop, deserialize `ClientMessage`, and send `InternalEvent::MessageFrom`
//   to the main thread. On EOF, I/O error, or an undecodable frame they send
//   `InternalEvent::Closed` and exit.
// - **Main thread**: owns the `Coordinator` (and through it the
//   `TcpTransport` holding every connection's write half). It handles one
//   event at a time, which is what makes coordinator handlers atomic.
//
// The main thread is the only writer to client streams. Reader threads only
// read. `TcpTransport::disconnect` shuts the socket down in both directions;
// the reader thread then sees EOF and reports `Closed`, which the coordinator
// ignores if it already tore the connection down.
//
// Shutdown: `RelayHandle::stop` clears `keep_running`; the main loop notices
// within `POLL_INTERVAL`, shuts down every open socket so reader threads
// unblock, and exits.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use remote_pong_protocol::framing::{read_message, write_message};
use remote_pong_protocol::message::{ClientMessage, ServerMessage};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::coordinator::Coordinator;
use crate::error::RelayError;
use crate::transport::{ConnectionId, Transport};

/// How often the accept loop and the main loop check `keep_running`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
        peer: SocketAddr,
    },
    MessageFrom {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Closed {
        connection: ConnectionId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the relay thread exits.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Write halves of every live connection, keyed by relay-assigned id.
#[derive(Default)]
pub struct TcpTransport {
    writers: HashMap<ConnectionId, BufWriter<TcpStream>>,
}

impl TcpTransport {
    fn register(&mut self, connection: ConnectionId, stream: TcpStream) {
        self.writers.insert(connection, BufWriter::new(stream));
    }

    fn shutdown_all(&mut self) {
        for (_, writer) in self.writers.drain() {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        }
    }
}

impl Transport for TcpTransport {
    fn emit(&mut self, connection: ConnectionId, message: &ServerMessage) {
        let Some(writer) = self.writers.get_mut(&connection) else {
            return;
        };
        // A failed write means the peer is gone; its reader thread will
        // report the close.
        if let Err(err) = send_message(writer, message) {
            debug!(%connection, %err, "write failed");
        }
    }

    fn disconnect(&mut self, connection: ConnectionId) {
        if let Some(writer) = self.writers.remove(&connection) {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
            debug!(%connection, "connection closed by relay");
        }
    }
}

/// Serialize a `ServerMessage` to JSON and write it with length-delimited
/// framing.
fn send_message(
    writer: &mut BufWriter<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

/// Start the relay on a background thread. Returns a handle for stopping it
/// and the bound address (useful when port 0 lets the OS pick a free port).
pub fn start_relay(config: &RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    let bind_addr = config.listen_addr();
    let listener = TcpListener::bind(&bind_addr).map_err(|source| RelayError::Bind {
        addr: bind_addr.clone(),
        source,
    })?;
    let addr = listener.local_addr()?;
    // Non-blocking so the accept thread can check keep_running periodically.
    listener.set_nonblocking(true)?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let thread = thread::spawn(move || {
        run_relay(listener, keep_running_clone);
    });

    info!(%addr, "relay listening");
    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, keep_running: Arc<AtomicBool>) {
    let mut coordinator = Coordinator::new(TcpTransport::default());
    let mut next_connection = 0_u64;

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        accept_loop(listener, tx_listener, keep_running_listener);
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                handle_event(&mut coordinator, event, &tx, &mut next_connection);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    coordinator.transport_mut().shutdown_all();
    info!("relay stopped");
}

/// Accept connections until `keep_running` is cleared or the listener fails.
fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false).ok();
                stream.set_nodelay(true).ok();
                if tx.send(InternalEvent::NewConnection { stream, peer }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                warn!(%err, "accept failed, listener stopping");
                break;
            }
        }
    }
}

/// Dispatch a single event.
fn handle_event(
    coordinator: &mut Coordinator<TcpTransport>,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    next_connection: &mut u64,
) {
    match event {
        InternalEvent::NewConnection { stream, peer } => {
            let connection = ConnectionId(*next_connection);
            *next_connection += 1;

            let read_stream = match stream.try_clone() {
                Ok(s) => s,
                Err(err) => {
                    warn!(%peer, %err, "failed to clone stream, dropping connection");
                    return;
                }
            };
            coordinator.transport_mut().register(connection, stream);
            debug!(%connection, %peer, "connection accepted");

            let tx_reader = tx.clone();
            thread::spawn(move || {
                reader_loop(BufReader::new(read_stream), connection, tx_reader);
            });
        }
        InternalEvent::MessageFrom {
            connection,
            message,
        } => {
            coordinator.handle_message(connection, message);
        }
        InternalEvent::Closed { connection } => {
            coordinator.handle_disconnect(connection);
            // Drop the write half too (no-op if the coordinator already did).
            coordinator.transport_mut().disconnect(connection);
        }
    }
}

/// Reader loop for a single connection. Runs in its own thread and exits
/// after reporting `Closed` exactly once.
fn reader_loop(mut reader: BufReader<TcpStream>, connection: ConnectionId, tx: Sender<InternalEvent>) {
    loop {
        let bytes = match read_message(&mut reader) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(%connection, %err, "read ended");
                break;
            }
        };
        match serde_json::from_slice::<ClientMessage>(&bytes) {
            Ok(message) => {
                if tx.send(InternalEvent::MessageFrom { connection, message }).is_err() {
                    // Main loop is gone.
                    return;
                }
            }
            Err(err) => {
                warn!(%connection, %err, "malformed message, closing connection");
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Closed { connection });
}
