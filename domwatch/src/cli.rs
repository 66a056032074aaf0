//! Command-line flags and policy assembly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use domwatch_core::Policy;
use domwatch_supervisor::{Readiness, SupervisorError, READINESS_POLL_INTERVAL};

use crate::logging::LogFormat;

/// Poll period used when `-p` is not given.
pub const DEFAULT_PERIOD_SECS: u64 = 5;

/// domwatch: supervise a single Xen domain and recover it according to policy.
#[derive(Parser, Debug)]
#[command(name = "domwatch", version, about)]
pub struct Args {
    /// Name of the domain to monitor.
    #[arg(short = 'n', long = "name", env = "DOMWATCH_NAME")]
    pub name: String,

    /// Config file used to recreate the domain. Required unless `-R` is set.
    #[arg(short = 'c', long = "config", env = "DOMWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not shut the domain down.
    #[arg(short = 'S', long = "no-shutdown")]
    pub no_shutdown: bool,

    /// Do not recreate the domain after it reboots.
    #[arg(short = 'R', long = "no-restart")]
    pub no_restart: bool,

    /// Do not shut the domain down when receiving a TERM signal.
    #[arg(short = 'T', long = "no-term-shutdown")]
    pub no_term_shutdown: bool,

    /// Do not destroy the domain's resources after it shuts down.
    #[arg(short = 'D', long = "no-destroy")]
    pub no_destroy: bool,

    /// Keep running after the domain has shut down.
    #[arg(short = 'I', long = "ignore-shutdown")]
    pub ignore_shutdown: bool,

    /// Attempt to recover from a stale domain id.
    #[arg(short = 'A', long = "recover-stale-id")]
    pub recover_stale_id: bool,

    /// Seconds between polls.
    #[arg(
        short = 'p',
        long = "period",
        env = "DOMWATCH_PERIOD",
        default_value_t = DEFAULT_PERIOD_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub period: u64,

    /// JSON policy file; flags are applied on top of it.
    #[arg(long = "policy")]
    pub policy: Option<PathBuf>,

    /// Path or name of the `xl` toolstack binary.
    #[arg(long = "xl", default_value = "xl")]
    pub xl: PathBuf,

    /// Poll for a recreated domain to register instead of waiting the full
    /// grace interval.
    #[arg(long = "readiness-poll")]
    pub readiness_poll: bool,

    /// Log level used when `DOMWATCH_LOG` and `RUST_LOG` are unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Poll period.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period)
    }

    /// How to wait for a recreated domain.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        if self.readiness_poll {
            Readiness::Poll { interval: READINESS_POLL_INTERVAL }
        } else {
            Readiness::Fixed
        }
    }

    /// Build and validate the policy from the policy file and flags.
    ///
    /// # Errors
    /// Returns [`SupervisorError::InvalidArguments`] if the policy file cannot
    /// be read or parsed, and [`SupervisorError::Policy`] if the result cannot
    /// be honoured (empty name, or restart without a config file).
    pub fn policy(&self) -> Result<Policy, SupervisorError> {
        let mut policy = match &self.policy {
            Some(path) => load_policy(path)?,
            None => Policy::default(),
        };

        if self.no_shutdown {
            policy.shutdown_enabled = false;
        }
        if self.no_restart {
            policy.restart_enabled = false;
        }
        if self.no_term_shutdown {
            policy.terminate_gracefully = false;
        }
        if self.no_destroy {
            policy.destroy_enabled = false;
        }
        if self.ignore_shutdown {
            policy.ignore_vm_shutdown = true;
        }
        if self.recover_stale_id {
            policy.recover_stale_identity = true;
        }

        policy.validate(&self.name, self.config.as_deref())?;
        Ok(policy)
    }
}

fn load_policy(path: &Path) -> Result<Policy, SupervisorError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SupervisorError::InvalidArguments(format!("cannot read policy file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        SupervisorError::InvalidArguments(format!("invalid policy file {}: {e}", path.display()))
    })
}
