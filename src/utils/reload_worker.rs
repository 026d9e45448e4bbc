use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{
    ports::reload::Reloader,
    utils::graceful_shutdown::{ShutdownReason, ShutdownToken},
};

/// Periodically triggers a [`Reloader`] until shutdown.
///
/// The worker never regenerates artifacts itself and must not overlap with a
/// generation run against the same output root.
pub struct ReloadWorker {
    reloader: Arc<dyn Reloader>,
    interval: Duration,
}

impl ReloadWorker {
    pub fn new(reloader: Arc<dyn Reloader>, interval: Duration) -> Self {
        Self { reloader, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep, reload, repeat. Returns the reason once `shutdown` fires.
    pub async fn run(&self, mut shutdown: ShutdownToken) -> ShutdownReason {
        tracing::info!(
            "Starting reload worker with interval {}",
            humantime::format_duration(self.interval)
        );

        let mut reloads: u64 = 0;
        loop {
            tokio::select! {
                reason = shutdown.cancelled() => {
                    tracing::info!(reloads, "Reload worker stopping: {:?}", reason);
                    return reason;
                }
                _ = sleep(self.interval) => {}
            }

            reloads += 1;
            self.reload_once().await;
        }
    }

    async fn reload_once(&self) {
        match self.reloader.reload().await {
            Ok(outcome) if outcome.success => {
                tracing::info!(
                    exit_code = ?outcome.exit_code,
                    stdout = %outcome.stdout.trim(),
                    stderr = %outcome.stderr.trim(),
                    "Reload finished"
                );
            }
            Ok(outcome) => {
                tracing::error!(
                    exit_code = ?outcome.exit_code,
                    stdout = %outcome.stdout.trim(),
                    stderr = %outcome.stderr.trim(),
                    "Reload command failed"
                );
            }
            Err(e) => {
                tracing::error!("Reload could not be started: {:#}", e);
            }
        }
    }
}
