//! Graceful shutdown helpers.
//!
//! `shutdown_signal` waits for either `Ctrl+C` or a `SIGTERM` on Unix and is
//! handed to the HTTP server as its graceful shutdown future.
//!
//! ```no_run
//! # async fn example() {
//! use eunoia::shutdown_signal;
//! shutdown_signal().await;
//! # }
//! ```

/// Waits for either `Ctrl+C` or `SIGTERM` (on Unix) to be received.
pub async fn shutdown_signal() {
    tracing::debug!("awaiting shutdown signal");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "no SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
}
