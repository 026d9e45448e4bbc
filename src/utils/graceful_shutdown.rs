use std::sync::{Arc, OnceLock};

use eyre::{Result, WrapErr};
use tokio::{signal, sync::broadcast};

/// Why the long-running worker is asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM
    Signal,
    /// Requested from code (tests, embedding applications)
    Requested,
    /// The shutdown channel went away
    Force,
}

/// Fans a single shutdown notification out to every [`ShutdownToken`]
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    /// Set once, by the first trigger
    shutdown_reason: Arc<OnceLock<ShutdownReason>>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            shutdown_tx,
            shutdown_reason: Arc::new(OnceLock::new()),
        }
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_reason.get().is_some()
    }

    /// Ask every token holder to stop. Later calls are ignored.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self.shutdown_reason.set(reason).is_ok() {
            tracing::info!("Shutdown triggered: {:?}", reason);
            // No receivers simply means nobody is waiting yet
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::debug!("Shutdown already initiated, ignoring {:?}", reason);
        }
    }

    /// Wait for SIGINT or SIGTERM, then trigger shutdown
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started, listening for SIGINT and SIGTERM");

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to listen for SIGINT")?;
                tracing::info!("Received SIGINT (Ctrl+C), shutting down");
            }
            result = wait_for_sigterm() => {
                result?;
                tracing::info!("Received SIGTERM, shutting down");
            }
        }

        self.trigger_shutdown(ShutdownReason::Signal);
        Ok(())
    }

    /// Create a token that resolves once shutdown is triggered
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            receiver: self.shutdown_tx.subscribe(),
            shutdown_reason: self.shutdown_reason.clone(),
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("Failed to register SIGTERM handler")?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    // Only Ctrl+C exists off unix
    std::future::pending::<()>().await;
    Ok(())
}

/// Cancellation handle passed into long-running tasks
pub struct ShutdownToken {
    receiver: broadcast::Receiver<ShutdownReason>,
    shutdown_reason: Arc<OnceLock<ShutdownReason>>,
}

impl Clone for ShutdownToken {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            shutdown_reason: self.shutdown_reason.clone(),
        }
    }
}

impl ShutdownToken {
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_reason.get().is_some()
    }

    /// Resolve once shutdown has been triggered, immediately if it already was
    pub async fn cancelled(&mut self) -> ShutdownReason {
        if let Some(reason) = self.shutdown_reason.get() {
            return *reason;
        }

        match self.receiver.recv().await {
            Ok(reason) => reason,
            Err(_) => self
                .shutdown_reason
                .get()
                .copied()
                .unwrap_or(ShutdownReason::Force),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn token_resolves_after_trigger() {
        let shutdown = GracefulShutdown::new();
        let mut token = shutdown.shutdown_token();
        assert!(!token.is_shutdown_initiated());

        shutdown.trigger_shutdown(ShutdownReason::Requested);

        let reason = timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert_eq!(reason, ShutdownReason::Requested);
        assert!(shutdown.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn token_created_after_trigger_reports_the_original_reason() {
        let shutdown = GracefulShutdown::new();
        shutdown.trigger_shutdown(ShutdownReason::Signal);

        let mut token = shutdown.shutdown_token();
        let reason = timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert_eq!(reason, ShutdownReason::Signal);
        assert_eq!(token.clone().cancelled().await, ShutdownReason::Signal);
    }

    #[tokio::test]
    async fn dropped_shutdown_without_trigger_forces_the_token() {
        let shutdown = GracefulShutdown::new();
        let mut token = shutdown.shutdown_token();
        drop(shutdown);

        assert_eq!(token.cancelled().await, ShutdownReason::Force);
        assert!(!token.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn second_trigger_is_ignored() {
        let shutdown = GracefulShutdown::new();
        let mut first = shutdown.shutdown_token();
        let mut second = first.clone();

        shutdown.trigger_shutdown(ShutdownReason::Signal);
        shutdown.trigger_shutdown(ShutdownReason::Requested);

        assert_eq!(first.cancelled().await, ShutdownReason::Signal);
        assert_eq!(second.cancelled().await, ShutdownReason::Signal);
    }
}
