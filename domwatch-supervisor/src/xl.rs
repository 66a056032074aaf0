//! `xl` toolstack adapter.
//!
//! Drives the Xen `xl` command-line tool for every control primitive and
//! parses its textual output.
//!
//! # Output formats
//! `xl domid <name>` prints the decimal domain id. `xl list -v <id>` prints a
//! header plus one row per domain:
//!
//! ```text
//! Name                                        ID   Mem VCPUs	State	Time(s)   UUID                            Reason-Code	Security Label
//! guest                                        5  1024     1     --ps--       3.1 5b1c7e3a-8a1e-4c6e-9d59-2f4e1a3c0b7d        1                -
//! ```
//!
//! The state column holds one flag per position (`r b p s c d`) or `-`. The
//! reason code is printed in hex while the domain is shut down and `-`
//! otherwise.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use domwatch_core::{DomainId, DomainStatus, ShutdownReason};

use crate::{AdapterError, HypervisorAdapter};

/// Positions of the flags in the `xl list` state column.
const STATE_FLAGS: [char; 6] = ['r', 'b', 'p', 's', 'c', 'd'];

/// Hypervisor adapter backed by the `xl` binary.
#[derive(Debug, Clone)]
pub struct XlAdapter {
    /// Path or bare name of the `xl` binary.
    binary_path: PathBuf,
}

impl XlAdapter {
    /// Create an adapter invoking the given `xl` binary.
    #[must_use]
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Create an adapter that looks `xl` up in `$PATH`.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(PathBuf::from("xl"))
    }

    /// Path of the `xl` binary this adapter invokes.
    #[must_use]
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Run `xl` with `args` and return its stdout on success.
    async fn run(&self, args: &[&str]) -> Result<String, AdapterError> {
        let command = format!("xl {}", args.join(" "));
        tracing::debug!(%command, "running toolstack command");

        let output = Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => output.status.to_string(),
            msg => msg.to_owned(),
        };
        Err(AdapterError::CommandFailed { command, reason })
    }
}

#[async_trait]
impl HypervisorAdapter for XlAdapter {
    async fn init(&self) -> Result<(), AdapterError> {
        let xl = locate_binary(&self.binary_path, std::env::var_os("PATH").as_deref())?;

        self.run(&["info"]).await.map_err(|e| AdapterError::ContextInit {
            reason: e.to_string(),
        })?;

        tracing::debug!(xl = %xl.display(), "toolstack context ready");
        Ok(())
    }

    async fn resolve_identity(&self, name: &str) -> Result<DomainId, AdapterError> {
        match self.run(&["domid", name]).await {
            Ok(stdout) => parse_domid(&stdout),
            Err(AdapterError::CommandFailed { .. }) => {
                Err(AdapterError::NotFound { name: name.to_owned() })
            }
            Err(e) => Err(e),
        }
    }

    async fn query_status(&self, id: DomainId) -> Result<DomainStatus, AdapterError> {
        let domid = id.to_string();
        match self.run(&["list", "-v", &domid]).await {
            Ok(stdout) => parse_list_verbose(&stdout),
            Err(AdapterError::CommandFailed { reason, .. }) => Err(AdapterError::Stale { id, reason }),
            Err(e) => Err(e),
        }
    }

    async fn destroy(&self, id: DomainId) -> Result<(), AdapterError> {
        self.run(&["destroy", &id.to_string()]).await.map(drop)
    }

    async fn request_cooperative_shutdown(&self, id: DomainId) -> Result<(), AdapterError> {
        self.run(&["shutdown", &id.to_string()]).await.map(drop)
    }

    async fn send_power_event(&self, id: DomainId) -> Result<(), AdapterError> {
        self.run(&["trigger", &id.to_string(), "power"]).await.map(drop)
    }

    async fn release(&self) {
        tracing::debug!("toolstack context released");
    }
}

/// Parse the output of `xl domid <name>`.
///
/// # Errors
/// Returns [`AdapterError::Parse`] if the output is not a decimal id.
pub fn parse_domid(output: &str) -> Result<DomainId, AdapterError> {
    output.parse::<DomainId>().map_err(|e| AdapterError::Parse(e.to_string()))
}

/// Parse the output of `xl list -v <id>` into a status snapshot.
///
/// Only the first domain row is read. The row is anchored on its state
/// column so that names containing spaces do not shift the other fields.
///
/// # Errors
/// Returns [`AdapterError::Parse`] if no row with a state column, UUID and
/// reason code is present.
pub fn parse_list_verbose(output: &str) -> Result<DomainStatus, AdapterError> {
    let row = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !is_header(line))
        .ok_or_else(|| AdapterError::Parse("no domain row in list output".to_owned()))?;

    let fields: Vec<&str> = row.split_whitespace().collect();
    let state_at = fields
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, f)| is_state_column(f))
        .map(|(i, _)| i)
        .ok_or_else(|| AdapterError::Parse(format!("no state column in row: {row}")))?;

    let (uuid, reason_code) = match (fields.get(state_at + 2), fields.get(state_at + 3)) {
        (Some(uuid), Some(reason)) => (*uuid, *reason),
        _ => return Err(AdapterError::Parse(format!("missing UUID or reason code in row: {row}"))),
    };

    let state = fields[state_at];
    let flag = |c: char| state.contains(c);
    let shutdown = flag('s') || flag('c');

    let reason = match reason_code {
        "-" => ShutdownReason::None,
        code => u32::from_str_radix(code, 16)
            .map(ShutdownReason::from_code)
            .map_err(|e| AdapterError::Parse(format!("reason code {code}: {e}")))?,
    };

    // A crashed domain may be listed before its reason is filled in.
    let reason = match (shutdown, reason) {
        (true, ShutdownReason::None) if flag('c') => ShutdownReason::Other,
        (true, r) => r,
        (false, _) => ShutdownReason::None,
    };

    let uuid = Uuid::parse_str(uuid)
        .map_err(|e| AdapterError::Parse(format!("domain UUID {uuid}: {e}")))?;

    let status = if shutdown { DomainStatus::shut_down(reason) } else { DomainStatus::running() };
    Ok(status.with_uuid(uuid))
}

/// The header row starts with the `Name` and `ID` column titles. A domain
/// row always carries a numeric id in its second field.
fn is_header(line: &str) -> bool {
    let mut fields = line.split_whitespace();
    fields.next() == Some("Name") && fields.next() == Some("ID")
}

fn is_state_column(field: &str) -> bool {
    field.chars().count() == STATE_FLAGS.len()
        && field.chars().zip(STATE_FLAGS).all(|(c, flag)| c == flag || c == '-')
}

/// Locate the toolstack binary. A path with a directory component is taken
/// as given; a bare name is looked up in `search_path` like a shell would.
fn locate_binary(binary: &Path, search_path: Option<&OsStr>) -> Result<PathBuf, AdapterError> {
    let not_found = || AdapterError::BinaryNotFound { path: binary.to_owned() };

    if binary.components().count() > 1 || binary.is_absolute() {
        return if binary.is_file() { Ok(binary.to_owned()) } else { Err(not_found()) };
    }

    search_path
        .map(std::env::split_paths)
        .into_iter()
        .flatten()
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
        .ok_or_else(not_found)
}
