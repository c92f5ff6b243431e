//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful drain. A second signal while
//! draining is treated by the binary as a request to exit immediately.

use crate::lifecycle::Shutdown;

/// Completes when the process receives SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Termination signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Termination signal received"),
    }
}

/// Wait for a termination signal and trigger `shutdown`.
///
/// A second signal exits the process with status 130 without waiting for the drain.
pub async fn forward_signals(shutdown: Shutdown) {
    termination_signal().await;
    shutdown.trigger();

    termination_signal().await;
    tracing::warn!("Second termination signal received, exiting without draining");
    std::process::exit(130);
}
