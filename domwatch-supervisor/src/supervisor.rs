//! The poll, classify and act loop.
//!
//! Each iteration runs strictly in the order poll → termination check →
//! shutdown classification → action. The loop ends when [`RunState`] stops
//! running or when the domain id goes stale beyond recovery.
//!
//! # Known race
//! Grace waits are fixed delays standing in for a readiness signal the
//! hypervisor does not provide. A destroy or recreate issued right after a
//! grace wait can still race a guest that has not finished tearing down.

use std::sync::Arc;

use domwatch_core::{decide, Action, DomainId, DomainStatus, ManagedDomain, Policy};

use crate::{ActionExecutor, AdapterError, HypervisorAdapter, ProcessLauncher, RunState, SupervisorError};

/// Supervises one domain until stopped.
pub struct Supervisor<A: HypervisorAdapter, L: ProcessLauncher> {
    executor: ActionExecutor<A, L>,
    domain: ManagedDomain,
    policy: Policy,
    run_state: Arc<RunState>,
}

impl<A: HypervisorAdapter, L: ProcessLauncher> Supervisor<A, L> {
    /// Create a supervisor for `domain`. Call [`start`](Self::start) before
    /// [`run`](Self::run).
    #[must_use]
    pub fn new(
        executor: ActionExecutor<A, L>,
        domain: ManagedDomain,
        policy: Policy,
        run_state: Arc<RunState>,
    ) -> Self {
        Self { executor, domain, policy, run_state }
    }

    /// The supervised domain.
    #[must_use]
    pub fn domain(&self) -> &ManagedDomain {
        &self.domain
    }

    /// Shared run-control state.
    #[must_use]
    pub fn run_state(&self) -> &Arc<RunState> {
        &self.run_state
    }

    /// Initialise the adapter and resolve the domain id.
    ///
    /// The adapter is released before returning an error.
    ///
    /// # Errors
    /// Returns [`SupervisorError::AdapterInit`] if the hypervisor cannot be
    /// controlled, or [`SupervisorError::IdentityResolution`] if the domain
    /// does not exist.
    pub async fn start(&mut self) -> Result<DomainId, SupervisorError> {
        if let Err(e) = self.executor.adapter().init().await {
            self.teardown().await;
            return Err(SupervisorError::AdapterInit(e));
        }

        match self.executor.resolve(&mut self.domain).await {
            Ok(id) => Ok(id),
            Err(source) => {
                self.teardown().await;
                Err(SupervisorError::IdentityResolution { name: self.domain.name.clone(), source })
            }
        }
    }

    /// Run the loop until stopped, then release the adapter.
    ///
    /// # Errors
    /// Returns [`SupervisorError::StaleIdentity`] if the domain id went stale
    /// and could not be recovered.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        tracing::info!(domain = %self.domain.name, "domain monitoring loop has started");

        let mut outcome = Ok(());
        while self.run_state.is_running() {
            if let Err(e) = self.step().await {
                outcome = Err(e);
                break;
            }
        }

        tracing::info!(domain = %self.domain.name, "domain monitoring loop has ended");
        self.teardown().await;
        outcome
    }

    /// Run one iteration and return the action taken.
    ///
    /// # Errors
    /// Returns [`SupervisorError::StaleIdentity`] if polling failed and
    /// could not be recovered.
    pub async fn step(&mut self) -> Result<Action, SupervisorError> {
        let status = self.poll().await?;
        let term_received = self.run_state.take_term();
        let action = decide(&status, term_received, &self.policy);

        if term_received {
            tracing::info!(domain = %self.domain.name, "received termination request, shutting down domain");
            if action == Action::None {
                tracing::info!(domain = %self.domain.name, "not shutting down domain because of configuration");
            }
        } else if status.shutdown {
            tracing::info!(
                domain = %self.domain.name,
                reason = %status.reason,
                %action,
                "domain reported shutdown"
            );
        } else {
            tracing::debug!(domain = %self.domain.name, "domain running");
        }

        self.executor.execute(action, &mut self.domain, &self.run_state).await;
        Ok(action)
    }

    /// Poll the domain, re-resolving its id at most once.
    async fn poll(&mut self) -> Result<DomainStatus, SupervisorError> {
        let err = match self.query().await {
            Ok(status) => return Ok(status),
            Err(e) => e,
        };

        if !self.policy.recover_stale_identity {
            tracing::error!(domain = %self.domain.name, error = %err, "could not get domain info");
            return Err(self.stale());
        }

        tracing::warn!(
            domain = %self.domain.name,
            error = %err,
            "domain id is stale, attempting to recover because of configuration"
        );
        if let Err(e) = self.executor.resolve(&mut self.domain).await {
            tracing::error!(domain = %self.domain.name, error = %e, "stale domain id recovery failed");
            return Err(self.stale());
        }

        match self.query().await {
            Ok(status) => Ok(status),
            Err(e) => {
                tracing::error!(domain = %self.domain.name, error = %e, "could not get domain info after recovery");
                Err(self.stale())
            }
        }
    }

    async fn query(&mut self) -> Result<DomainStatus, AdapterError> {
        let Some(id) = self.domain.id else {
            return Err(AdapterError::NotFound { name: self.domain.name.clone() });
        };

        let status = self.executor.adapter().query_status(id).await?;
        if let Some(uuid) = status.uuid {
            if self.domain.uuid != Some(uuid) {
                tracing::debug!(domain = %self.domain.name, domid = %id, %uuid, "domain uuid");
                self.domain.uuid = Some(uuid);
            }
        }
        Ok(status)
    }

    fn stale(&self) -> SupervisorError {
        SupervisorError::StaleIdentity { name: self.domain.name.clone() }
    }

    async fn teardown(&self) {
        tracing::info!("gracefully shutting down");
        self.executor.adapter().release().await;
    }
}
