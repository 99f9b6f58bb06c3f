// Shutdown signal module
//
// SIGINT (Ctrl+C) and, on Unix, SIGTERM stop the accept loop.

use crate::logger;

/// Resolves when the process is asked to stop
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => logger::log_info("Received SIGINT"),
                    _ = sigterm.recv() => logger::log_info("Received SIGTERM"),
                }
            }
            Err(e) => {
                logger::log_warning(&format!("Failed to install SIGTERM handler: {e}"));
                wait_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
        std::future::pending::<()>().await;
    }
}
