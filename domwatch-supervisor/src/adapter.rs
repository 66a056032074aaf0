//! Hypervisor control abstraction.
//!
//! Lets the supervisor run against the `xl` toolstack in production and a
//! scripted fake in tests without changing the loop.

use async_trait::async_trait;

use domwatch_core::{DomainId, DomainStatus};

use crate::AdapterError;

/// Control primitives for a single hypervisor.
///
/// Every method reports failure through its return value; whether a failure
/// is fatal is decided by the caller.
#[async_trait]
pub trait HypervisorAdapter: Send + Sync {
    /// Check that the hypervisor can be controlled at all.
    ///
    /// # Errors
    /// Returns [`AdapterError::BinaryNotFound`] or [`AdapterError::ContextInit`]
    /// if the control context is unusable.
    async fn init(&self) -> Result<(), AdapterError>;

    /// Look up the current id of the domain called `name`.
    ///
    /// # Errors
    /// Returns [`AdapterError::NotFound`] if no such domain exists.
    async fn resolve_identity(&self, name: &str) -> Result<DomainId, AdapterError>;

    /// Query the runtime status of domain `id`.
    ///
    /// # Errors
    /// Returns [`AdapterError::Stale`] if the id is no longer known.
    async fn query_status(&self, id: DomainId) -> Result<DomainStatus, AdapterError>;

    /// Hard-destroy the domain and release its resources.
    ///
    /// # Errors
    /// Returns [`AdapterError::CommandFailed`] if the hypervisor refuses.
    async fn destroy(&self, id: DomainId) -> Result<(), AdapterError>;

    /// Ask the guest to shut itself down through its PV control interface.
    ///
    /// # Errors
    /// Returns [`AdapterError::CommandFailed`] if the guest cannot be asked.
    async fn request_cooperative_shutdown(&self, id: DomainId) -> Result<(), AdapterError>;

    /// Press the guest's virtual ACPI power button.
    ///
    /// # Errors
    /// Returns [`AdapterError::CommandFailed`] if the event is rejected.
    async fn send_power_event(&self, id: DomainId) -> Result<(), AdapterError>;

    /// Release the control context. Called once during teardown.
    async fn release(&self) {}
}
