// The seam between the coordinator and the network.
//
// The coordinator never touches sockets. It addresses connections by a
// relay-assigned `ConnectionId` and asks a `Transport` to deliver a message
// or close a connection. `server.rs` provides the TCP implementation; unit
// tests use an in-memory recorder.
//
// Delivery is fire-and-forget. `disconnect` must be idempotent, and the close
// event it eventually produces is fed back into
// `Coordinator::handle_disconnect`, which treats an already-torn-down
// connection as a no-op.

use std::fmt;

use remote_pong_protocol::ServerMessage;

/// Relay-assigned identifier of one accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound half of the connection layer.
pub trait Transport {
    /// Send `message` to `connection`. Unknown or closed connections are
    /// silently skipped.
    fn emit(&mut self, connection: ConnectionId, message: &ServerMessage);

    /// Forcibly close `connection`.
    fn disconnect(&mut self, connection: ConnectionId);
}
