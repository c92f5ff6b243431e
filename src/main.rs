//! auth-frontend
//!
//! Serves the built-in handler behind the request lifecycle and error protocol.
//!
//! ```text
//!     Client ──▶ listener ──▶ connection ──▶ current handler ──▶ response
//!                                                  ▲
//!     config file ──▶ watcher ──▶ reload task ─────┘ (atomic swap)
//!
//!     SIGINT/SIGTERM ──▶ shutdown ──▶ stop accepting ──▶ drain ──▶ exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use auth_frontend::config::{load_config, ConfigWatcher, ServiceConfig};
use auth_frontend::http::{builtin, Server};
use auth_frontend::lifecycle::{signals, DrainOutcome, Shutdown};
use auth_frontend::observability::{init_logging, init_metrics};

#[derive(Debug, Parser)]
#[command(name = "auth-frontend", version, about = "Hot-reloadable auth API front end")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the handler when the configuration file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "auth-frontend starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        header_read_secs = config.timeouts.header_read_secs,
        shutdown_grace_secs = config.timeouts.shutdown_grace_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    // The watcher stops delivering updates when this guard is dropped.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = Server::new(config, builtin::router);
    let listener = server.bind()?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(signals::forward_signals(shutdown));

    match server.run(listener, config_updates, shutdown_rx).await? {
        DrainOutcome::Completed => tracing::info!("Shutdown complete"),
        DrainOutcome::TimedOut { remaining } => {
            tracing::warn!(remaining_connections = remaining, "Shutdown complete after forced close")
        }
    }
    Ok(())
}
