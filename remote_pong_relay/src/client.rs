// Blocking TCP client for talking to a relay.
//
// Real fields and controllers are browser pages; this client exists for
// integration tests, load scripts and debugging tools that need to act as
// either side without a browser. Architecture mirrors the server:
// - `connect()` opens the TCP stream and spawns a background reader thread.
// - The reader thread decodes framed `ServerMessage`s and pushes them into an
//   `mpsc` channel. It exits when the relay closes the connection, which
//   drops the sender and lets callers observe the close.
// - The caller holds a `BufWriter<TcpStream>` for sending.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use remote_pong_protocol::framing::{read_message, write_message};
use remote_pong_protocol::message::{ClientMessage, ServerMessage};
use serde::Serialize;

use crate::error::ClientError;

/// TCP client for relay communication.
pub struct RelayClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: JoinHandle<()>,
}

impl RelayClient {
    /// Connect to a relay and spawn the reader thread.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let reader = BufReader::new(stream.try_clone()?);

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));

        Ok(Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            _reader_thread: reader_thread,
        })
    }

    /// Serialize and send one message.
    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        self.send_frame(msg)
    }

    /// Send a hand-written JSON frame, such as the loosely typed input a
    /// browser client may produce.
    pub fn send_raw(&mut self, frame: &serde_json::Value) -> Result<(), ClientError> {
        self.send_frame(frame)
    }

    fn send_frame<T: Serialize + ?Sized>(&mut self, payload: &T) -> Result<(), ClientError> {
        let json = serde_json::to_vec(payload)?;
        write_message(&mut self.writer, &json)?;
        Ok(())
    }

    /// Wait up to `timeout` for the next message. `None` on timeout or once
    /// the relay has closed the connection and the inbox is drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        self.inbox.recv_timeout(timeout).ok()
    }

    /// Drain all queued messages without blocking.
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for the relay to close this connection, collecting
    /// whatever it sent first. Returns `None` if the connection stayed open.
    pub fn wait_closed(&self, timeout: Duration) -> Option<Vec<ServerMessage>> {
        let deadline = Instant::now() + timeout;
        let mut messages = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(msg) => messages.push(msg),
                Err(RecvTimeoutError::Disconnected) => return Some(messages),
                Err(RecvTimeoutError::Timeout) => return None,
            }
        }
    }

    /// Close the connection from the client side.
    pub fn close(self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Client dropped the receiver
                }
            }
            Err(_) => break, // Malformed message
        }
    }
}
