//! OS signal handling: SIGINT and SIGTERM both trigger graceful shutdown.

use crate::lifecycle::shutdown::Shutdown;

/// Wait for the first termination signal, then trigger `shutdown`.
pub async fn watch_signals(shutdown: Shutdown) {
    wait_for_termination().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
