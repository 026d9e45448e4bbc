use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tokio::process::Command;

use crate::ports::reload::{ReloadOutcome, Reloader};

/// Reloader that runs an external executable (typically a shell script calling
/// `nginx -s reload`) without arguments
#[derive(Debug, Clone)]
pub struct ScriptReloader {
    command: PathBuf,
}

impl ScriptReloader {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &PathBuf {
        &self.command
    }
}

#[async_trait]
impl Reloader for ScriptReloader {
    async fn reload(&self) -> Result<ReloadOutcome> {
        tracing::info!(command = %self.command.display(), "Running reload command");

        let output = Command::new(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .wrap_err_with(|| format!("Failed to run reload command {}", self.command.display()))?;

        Ok(ReloadOutcome {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
