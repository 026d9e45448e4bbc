use async_trait::async_trait;
use eyre::Result;

/// Captured result of one reload invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Reloader defines the port (interface) used to make nginx pick up new artifacts
#[async_trait]
pub trait Reloader: Send + Sync {
    /// Trigger one reload and wait for it to finish
    async fn reload(&self) -> Result<ReloadOutcome>;
}
