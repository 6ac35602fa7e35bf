// remote_pong_relay — session relay between Remote Pong fields and the phones
// that control their paddles.
//
// The relay is a thin coordinator: a field (the browser page that renders the
// game and owns all physics) registers, phones join it as controllers, and
// the relay forwards their input. It tracks who belongs to which field,
// assigns sides when the game starts, removes the losers of each round, and
// folds each side's paddle inputs into one consensus direction. It never
// simulates the game.
//
// Module overview:
// - `registry.rs`:    Append-only slot tables for fields and controllers.
// - `coordinator.rs`: Session lifecycle, round resolution, teardown
//                     cascades. The core state machine `server.rs` drives.
// - `direction.rs`:   Per-side direction consensus (sign of the mean).
// - `transport.rs`:   `Transport` trait and `ConnectionId`, the seam between
//                     the coordinator and the network.
// - `server.rs`:      TCP listener, reader threads (one per connection), and
//                     the single-threaded main loop owning the coordinator.
// - `client.rs`:      Blocking client used by tests and tooling.
// - `config.rs`:      CLI/env/file configuration layering.
// - `error.rs`:       Error types.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded via
// `start_relay`.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod direction;
pub mod error;
pub mod registry;
pub mod server;
pub mod transport;

pub use config::RelayConfig;
pub use server::start_relay;
