//! Operator policy: which recovery actions the supervisor may take.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Recovery actions enabled for this supervisor instance.
///
/// Built once at startup and never mutated afterwards. Every field can be
/// supplied from a JSON policy file; missing fields take the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Ask the guest to shut down when a termination request arrives.
    pub shutdown_enabled: bool,

    /// Recreate the domain after the guest reboots.
    pub restart_enabled: bool,

    /// Destroy the domain's resources after it shuts down or reboots.
    pub destroy_enabled: bool,

    /// Route termination requests through a guest shutdown instead of
    /// stopping immediately.
    pub terminate_gracefully: bool,

    /// Keep supervising after the guest has shut down.
    pub ignore_vm_shutdown: bool,

    /// Re-resolve the domain id once when a poll finds it stale.
    pub recover_stale_identity: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            shutdown_enabled: true,
            restart_enabled: true,
            destroy_enabled: true,
            terminate_gracefully: true,
            ignore_vm_shutdown: false,
            recover_stale_identity: false,
        }
    }
}

impl Policy {
    /// Check that the policy can be honoured for a domain.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyDomainName`] if `name` is empty.
    /// Returns [`CoreError::MissingConfigFile`] if restart is enabled and no
    /// config file was supplied.
    pub fn validate(&self, name: &str, config_path: Option<&Path>) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::EmptyDomainName);
        }
        if self.restart_enabled && config_path.is_none() {
            return Err(CoreError::MissingConfigFile);
        }
        Ok(())
    }
}
