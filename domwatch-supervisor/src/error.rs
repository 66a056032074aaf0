//! Error types for the supervisor crate.

use std::path::PathBuf;

use domwatch_core::{CoreError, DomainId};

/// Errors reported by a [`HypervisorAdapter`](crate::HypervisorAdapter).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// The toolstack binary could not be found.
    #[error("toolstack binary not found at {path}")]
    BinaryNotFound { path: PathBuf },

    /// The adapter could not establish a usable control context.
    #[error("hypervisor context init failed: {reason}")]
    ContextInit { reason: String },

    /// No domain with this name exists.
    #[error("domain {name} does not exist")]
    NotFound { name: String },

    /// The hypervisor no longer recognises this id.
    #[error("domain id {id} is stale: {reason}")]
    Stale { id: DomainId, reason: String },

    /// A control command ran but reported failure.
    #[error("{command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Toolstack output could not be understood.
    #[error("unparseable toolstack output: {0}")]
    Parse(String),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`ProcessLauncher`](crate::ProcessLauncher).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LaunchError {
    /// The creation tool could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal conditions that end the process.
///
/// Each variant maps onto a process exit code via [`SupervisorError::exit_code`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SupervisorError {
    /// Command-line or policy validation failed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The policy could not be honoured for this domain.
    #[error(transparent)]
    Policy(#[from] CoreError),

    /// The logging subscriber could not be installed.
    #[error("cannot initialise logging: {0}")]
    LoggerInit(String),

    /// The process lacks the privilege the hypervisor requires.
    #[error("hypervisor access requires root, please run as root")]
    InsufficientPrivilege,

    /// Signal handlers could not be registered.
    #[error("cannot register signal handlers: {0}")]
    SignalInstall(#[source] std::io::Error),

    /// The hypervisor adapter could not be initialised.
    #[error("cannot initialise hypervisor context: {0}")]
    AdapterInit(#[source] AdapterError),

    /// The domain could not be found at startup.
    #[error("domain {name} does not exist, so it cannot be monitored")]
    IdentityResolution {
        name: String,
        #[source]
        source: AdapterError,
    },

    /// The domain id went stale and could not be recovered.
    #[error("could not get info for domain {name}")]
    StaleIdentity { name: String },
}

impl SupervisorError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArguments(_)
            | Self::Policy(_)
            | Self::LoggerInit(_)
            | Self::InsufficientPrivilege
            | Self::SignalInstall(_) => 1,
            Self::AdapterInit(_) => 2,
            Self::IdentityResolution { .. } => 3,
            Self::StaleIdentity { .. } => 4,
        }
    }
}
