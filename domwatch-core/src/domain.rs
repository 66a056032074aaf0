//! The supervised domain and the status snapshots taken of it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Hypervisor-assigned id addressing one running incarnation of a domain.
///
/// A new id is handed out every time the domain is created, so an id can go
/// stale while the domain name stays the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainId(pub u32);

impl DomainId {
    /// Returns the raw numeric id.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DomainId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for DomainId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| CoreError::InvalidDomainId { value: s.to_owned(), reason: e.to_string() })
    }
}

/// The single domain this process supervises.
///
/// Owned by the supervisor loop; the id is only changed by name resolution.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ManagedDomain {
    /// Human-readable domain name, stable across recreations.
    pub name: String,

    /// Current id, absent until resolved or after a failed re-resolution.
    pub id: Option<DomainId>,

    /// Config file handed to the creation tool on recreate.
    pub config_path: Option<PathBuf>,

    /// UUID reported by the most recent successful poll.
    pub uuid: Option<Uuid>,

    /// When the current id was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ManagedDomain {
    /// Create an unresolved domain.
    #[must_use]
    pub fn new(name: impl Into<String>, config_path: Option<PathBuf>) -> Self {
        Self { name: name.into(), id: None, config_path, uuid: None, resolved_at: None }
    }

    /// Record a freshly resolved id.
    ///
    /// Returns `true` if the id differs from the previous one.
    pub fn set_id(&mut self, id: DomainId) -> bool {
        let changed = self.id != Some(id);
        self.id = Some(id);
        self.resolved_at = Some(Utc::now());
        changed
    }

    /// Forget the current id after resolution failed.
    pub fn clear_id(&mut self) {
        self.id = None;
        self.uuid = None;
        self.resolved_at = None;
    }

    /// Path of the creation config file, if one was supplied.
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Why a domain reported itself as shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    /// No shutdown has been reported.
    None,
    /// The guest powered itself off.
    PowerOff,
    /// The guest asked to be rebooted.
    Reboot,
    /// Suspend, crash, watchdog, soft reset or an unknown code.
    Other,
}

impl ShutdownReason {
    /// Map a libxl shutdown reason code.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::PowerOff,
            1 => Self::Reboot,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::PowerOff => "poweroff",
            Self::Reboot => "reboot",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Result of one status poll. Recomputed every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DomainStatus {
    /// The hypervisor still knows the domain.
    pub present: bool,

    /// The guest has shut down (or crashed) and is waiting to be reaped.
    pub shutdown: bool,

    /// Reason attached to the shutdown; [`ShutdownReason::None`] otherwise.
    pub reason: ShutdownReason,

    /// Domain UUID, when the adapter reports one.
    pub uuid: Option<Uuid>,
}

impl DomainStatus {
    /// A present domain that has not shut down.
    #[must_use]
    pub fn running() -> Self {
        Self { present: true, shutdown: false, reason: ShutdownReason::None, uuid: None }
    }

    /// A present domain that has shut down for `reason`.
    #[must_use]
    pub fn shut_down(reason: ShutdownReason) -> Self {
        Self { present: true, shutdown: true, reason, uuid: None }
    }

    /// Attach the domain UUID.
    #[must_use]
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }
}
