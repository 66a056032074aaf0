//! Carrying out recovery actions against the hypervisor.
//!
//! Every failure in here is soft: it is logged and the loop carries on,
//! because once a destroy, shutdown or launch has been attempted there is no
//! further automated recovery to fall back to.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

use domwatch_core::{Action, DomainId, ManagedDomain};

use crate::{AdapterError, HypervisorAdapter, ProcessLauncher, RunState};

/// Default interval between registration checks in [`Readiness::Poll`] mode.
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How to wait for a recreated domain to register with the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Wait the full grace interval, then resolve the name once.
    #[default]
    Fixed,
    /// Resolve the name every `interval` until a new id appears or the grace
    /// interval runs out.
    Poll { interval: Duration },
}

/// One way of asking a guest to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStrategy {
    /// PV shutdown request the guest may honour.
    Cooperative,
    /// Simulated ACPI power button press.
    PowerButton,
}

impl ShutdownStrategy {
    /// Default escalation order.
    pub const ESCALATION: [Self; 2] = [Self::Cooperative, Self::PowerButton];
}

impl fmt::Display for ShutdownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cooperative => f.write_str("pv-shutdown"),
            Self::PowerButton => f.write_str("acpi-power-button"),
        }
    }
}

/// Executes [`Action`]s for one domain.
///
/// Owns the hypervisor adapter and the process launcher; the supervisor
/// reaches the adapter through [`ActionExecutor::adapter`] for polling.
pub struct ActionExecutor<A: HypervisorAdapter, L: ProcessLauncher> {
    adapter: A,
    launcher: L,
    readiness: Readiness,
    shutdown_strategies: Vec<ShutdownStrategy>,
}

impl<A: HypervisorAdapter, L: ProcessLauncher> ActionExecutor<A, L> {
    /// Create an executor with fixed waits and the default shutdown escalation.
    #[must_use]
    pub fn new(adapter: A, launcher: L) -> Self {
        Self {
            adapter,
            launcher,
            readiness: Readiness::Fixed,
            shutdown_strategies: ShutdownStrategy::ESCALATION.to_vec(),
        }
    }

    /// Use `readiness` when waiting for a recreated domain.
    #[must_use]
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Replace the shutdown escalation order.
    #[must_use]
    pub fn with_shutdown_strategies(mut self, strategies: Vec<ShutdownStrategy>) -> Self {
        self.shutdown_strategies = strategies;
        self
    }

    /// The hypervisor adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Carry out `action` for `domain`.
    ///
    /// Grace waits before destructive steps are fixed at twice the poll
    /// period and cannot be cut short; the trailing one-period waits end early
    /// when the loop is stopped.
    pub async fn execute(&self, action: Action, domain: &mut ManagedDomain, run_state: &RunState) {
        let period = run_state.period();
        let grace = period * 2;

        match action {
            Action::None => {}
            Action::GracefulShutdownOnly => {
                self.graceful_shutdown(domain).await;
            }
            Action::DestroyThenRecreate => {
                tracing::info!(domain = %domain.name, "domain is rebooting, waiting before destroying and recreating");
                tokio::time::sleep(grace).await;
                self.destroy(domain).await;
                self.recreate(domain, grace).await;
            }
            Action::RecreateWithoutDestroy => {
                tracing::info!(domain = %domain.name, "domain is rebooting, waiting before recreating");
                tokio::time::sleep(grace).await;
                tracing::info!(domain = %domain.name, "not destroying domain because of configuration");
                self.recreate(domain, grace).await;
            }
            Action::DestroyThenStop => {
                tracing::info!(domain = %domain.name, "domain is shutting down, waiting before destroying");
                tokio::time::sleep(grace).await;
                self.destroy(domain).await;
                stop_loop(run_state);
            }
            Action::DestroyThenContinue => {
                tracing::info!(domain = %domain.name, "domain is shutting down, waiting before destroying");
                tokio::time::sleep(grace).await;
                self.destroy(domain).await;
                tracing::info!(domain = %domain.name, "ignoring domain shutdown and continuing because of configuration");
                run_state.idle(period).await;
            }
            Action::StopOnly => {
                tracing::info!(domain = %domain.name, "not destroying domain because of configuration");
                stop_loop(run_state);
            }
            Action::NoOpSleep => run_state.idle(period).await,
        }
    }

    /// Resolve the domain name to its current id and record it.
    ///
    /// # Errors
    /// Propagates [`HypervisorAdapter::resolve_identity`] failures; the
    /// recorded id is left untouched in that case.
    pub async fn resolve(&self, domain: &mut ManagedDomain) -> Result<DomainId, AdapterError> {
        let id = self.adapter.resolve_identity(&domain.name).await?;
        record_identity(domain, id);
        Ok(id)
    }

    /// Hard-destroy the domain. Never fails.
    pub async fn destroy(&self, domain: &ManagedDomain) {
        let Some(id) = domain.id else {
            tracing::warn!(domain = %domain.name, "no domain id to destroy");
            return;
        };

        tracing::info!(domain = %domain.name, domid = %id, "destroying domain");
        match self.adapter.destroy(id).await {
            Ok(()) => tracing::info!(domain = %domain.name, domid = %id, "domain destroyed"),
            Err(e) => tracing::error!(domain = %domain.name, domid = %id, error = %e, "domain destroy failed"),
        }
    }

    /// Ask the guest to shut down, escalating through the configured
    /// strategies.
    ///
    /// Returns the strategy that was accepted, or `None` if every strategy
    /// was refused.
    pub async fn graceful_shutdown(&self, domain: &ManagedDomain) -> Option<ShutdownStrategy> {
        let Some(id) = domain.id else {
            tracing::warn!(domain = %domain.name, "no domain id to shut down");
            return None;
        };

        tracing::info!(domain = %domain.name, domid = %id, "gracefully shutting down domain");
        for &strategy in &self.shutdown_strategies {
            let result = match strategy {
                ShutdownStrategy::Cooperative => self.adapter.request_cooperative_shutdown(id).await,
                ShutdownStrategy::PowerButton => self.adapter.send_power_event(id).await,
            };
            match result {
                Ok(()) => {
                    tracing::info!(domain = %domain.name, %strategy, "domain shutdown requested");
                    return Some(strategy);
                }
                Err(e) => {
                    tracing::warn!(domain = %domain.name, %strategy, error = %e, "domain refused shutdown request");
                }
            }
        }

        tracing::error!(domain = %domain.name, "domain accepted no shutdown request");
        None
    }

    /// Launch the creation tool and pick up the new domain id.
    ///
    /// A launch failure leaves the id untouched. A resolution failure after a
    /// successful launch clears it, so the next poll goes through stale-id
    /// handling.
    pub async fn recreate(&self, domain: &mut ManagedDomain, grace: Duration) {
        let Some(config_path) = domain.config_path().map(Path::to_path_buf) else {
            tracing::warn!(domain = %domain.name, "no config file, cannot recreate domain");
            return;
        };

        tracing::info!(domain = %domain.name, config = %config_path.display(), "creating domain");
        if let Err(e) = self.launcher.launch(&config_path).await {
            tracing::error!(domain = %domain.name, error = %e, "failed to launch creation tool");
            return;
        }

        tracing::info!(domain = %domain.name, "creation tool spawned, waiting before continuing");
        match self.await_registration(&domain.name, domain.id, grace).await {
            Ok(id) => record_identity(domain, id),
            Err(e) => {
                tracing::warn!(domain = %domain.name, error = %e, "recreated domain did not register");
                domain.clear_id();
            }
        }
    }

    async fn await_registration(
        &self,
        name: &str,
        previous: Option<DomainId>,
        grace: Duration,
    ) -> Result<DomainId, AdapterError> {
        match self.readiness {
            Readiness::Fixed => {
                tokio::time::sleep(grace).await;
                self.adapter.resolve_identity(name).await
            }
            Readiness::Poll { interval } => {
                let deadline = Instant::now() + grace;
                loop {
                    tokio::time::sleep(interval).await;
                    let attempt = self.adapter.resolve_identity(name).await;
                    let fresh = matches!(attempt, Ok(id) if Some(id) != previous);
                    if fresh || Instant::now() >= deadline {
                        return attempt;
                    }
                }
            }
        }
    }
}

fn record_identity(domain: &mut ManagedDomain, id: DomainId) {
    if domain.set_id(id) {
        tracing::info!(domain = %domain.name, domid = %id, "new domain id");
    } else {
        tracing::debug!(domain = %domain.name, domid = %id, "domain id unchanged");
    }
}

fn stop_loop(run_state: &RunState) {
    if run_state.stop() {
        tracing::info!("domain shut down, stopping monitoring loop");
    }
}
