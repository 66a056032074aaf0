//! Launching the external domain creation tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::LaunchError;

/// Starts the out-of-process tool that brings a new domain instance up.
///
/// `launch` returns once the tool has been started; it does not wait for the
/// domain to register. Waiting is the caller's job.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start the creation tool with `config_path` as its only argument.
    ///
    /// # Errors
    /// Returns [`LaunchError::Spawn`] if the tool cannot be started.
    async fn launch(&self, config_path: &Path) -> Result<(), LaunchError>;
}

/// Launches `xl create <config>`.
#[derive(Debug, Clone)]
pub struct XlCreateLauncher {
    binary_path: PathBuf,
}

impl XlCreateLauncher {
    /// Create a launcher invoking the given `xl` binary.
    #[must_use]
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[async_trait]
impl ProcessLauncher for XlCreateLauncher {
    async fn launch(&self, config_path: &Path) -> Result<(), LaunchError> {
        let mut child = Command::new(&self.binary_path)
            .arg("create")
            .arg(config_path)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn { program: self.binary_path.clone(), source })?;

        let pid = child.id();
        tracing::info!(pid, config = %config_path.display(), "creation tool spawned");

        // Reaped in the background; the loop never waits on the tool.
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::debug!(pid, "creation tool finished");
                }
                Ok(status) => tracing::warn!(pid, %status, "creation tool exited with failure"),
                Err(e) => tracing::warn!(pid, error = %e, "cannot wait for creation tool"),
            }
        });

        Ok(())
    }
}
