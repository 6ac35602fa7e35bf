// CLI entry point for the Remote Pong relay.
//
// Loads the layered configuration (flags, environment, `config/config.json`),
// sets up logging, and runs the relay until the process is killed. See
// `server.rs` for the networking architecture and `coordinator.rs` for the
// session rules.
//
// Usage:
//   relay [OPTIONS]
//     --config <PATH>       JSON config file (default: config/config.json)
//     --bind <ADDR>         Listen address (default: 127.0.0.1)
//     --port <PORT>         Listen port (default: 7878, env PORT)
//     --log-level <LEVEL>   Log level (default: info, RUST_LOG overrides)
//     --json-logs           Emit JSON log lines

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use remote_pong_relay::config::{Cli, RelayConfig};
use remote_pong_relay::start_relay;

fn init_logging(config: &RelayConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(&cli)?;
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "remote pong relay starting");
    let (handle, addr) = start_relay(&config)?;
    info!(%addr, "press Ctrl+C to stop");

    // The relay runs until the process is killed; SIGINT/SIGTERM terminate
    // it with the default handlers, which is all a stateless relay needs.
    handle.wait();
    Ok(())
}
