//! Stop — shutdown signal handling.

use tracing::{info, warn};

/// Resolve once Ctrl+C is received.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping workers"),
        Err(e) => {
            // Without a signal handler the agent can still exit on EOF.
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
