//! Signal handling for graceful shutdown.

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::watch;

/// SIGTERM and SIGINT listeners, installed up front so a failure is reported at startup.
pub struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Completes when a shutdown signal is received.
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = self.sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }
}

/// Install the signal handlers and spawn a task that flips the returned
/// channel to `true` on SIGTERM or SIGINT.
pub fn spawn_shutdown_handler() -> std::io::Result<watch::Receiver<bool>> {
    let signals = ShutdownSignals::install()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        signals.recv().await;
        let _ = shutdown_tx.send(true);
    });

    Ok(shutdown_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_keeps_channel_open_until_signalled() {
        let shutdown_rx = spawn_shutdown_handler().unwrap();
        tokio::task::yield_now().await;

        assert!(!*shutdown_rx.borrow());
        // A dropped sender would read as a shutdown to the subscriber.
        assert!(shutdown_rx.has_changed().is_ok());
    }
}
