//! Mapping of OS signals onto [`RunState`] flags.
//!
//! The listener task only writes flags. Everything that talks to the
//! hypervisor happens in the monitoring loop.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::{RunState, SupervisorError};

/// An inbound interrupt source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundSignal {
    /// Operator interrupt (`SIGINT`).
    Interrupt,
    /// Process manager stop (`SIGTERM`).
    Terminate,
}

/// Apply `signal` to `run_state`.
///
/// An interrupt stops the loop. A termination request is queued for the loop
/// when `terminate_gracefully` is set and otherwise behaves like an interrupt.
pub fn route(signal: InboundSignal, run_state: &RunState, terminate_gracefully: bool) {
    match signal {
        InboundSignal::Terminate if terminate_gracefully => {
            tracing::info!("received TERM, domain shutdown queued");
            run_state.request_term();
        }
        InboundSignal::Interrupt | InboundSignal::Terminate => {
            if run_state.stop() {
                tracing::info!(signal = ?signal, "received signal, stopping monitoring loop");
            }
        }
    }
}

/// Background listener forwarding `SIGINT` and `SIGTERM` to a [`RunState`].
///
/// Dropping the bridge stops listening.
#[derive(Debug)]
pub struct SignalBridge {
    task: JoinHandle<()>,
}

impl SignalBridge {
    /// Register the signal handlers and start the listener task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`SupervisorError::SignalInstall`] if a handler cannot be
    /// registered.
    pub fn install(
        run_state: Arc<RunState>,
        terminate_gracefully: bool,
    ) -> Result<Self, SupervisorError> {
        let mut sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::SignalInstall)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::SignalInstall)?;

        let task = tokio::spawn(async move {
            loop {
                let inbound = tokio::select! {
                    Some(()) = sigint.recv() => InboundSignal::Interrupt,
                    Some(()) = sigterm.recv() => InboundSignal::Terminate,
                    else => break,
                };
                route(inbound, &run_state, terminate_gracefully);
            }
        });

        Ok(Self { task })
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}
