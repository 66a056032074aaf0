//! Lifecycle supervision for a single hypervisor domain.
//!
//! Polls the domain's runtime status, classifies shutdowns and reboots, and
//! drives destroy, shutdown and recreate actions according to the operator
//! [`Policy`](domwatch_core::Policy).

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod adapter;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod run_state;
pub mod signals;
pub mod supervisor;
pub mod xl;

#[cfg(test)]
mod fake;

pub use adapter::HypervisorAdapter;
pub use error::{AdapterError, LaunchError, SupervisorError};
pub use executor::{ActionExecutor, Readiness, ShutdownStrategy, READINESS_POLL_INTERVAL};
pub use launcher::{ProcessLauncher, XlCreateLauncher};
pub use run_state::RunState;
pub use signals::{route, InboundSignal, SignalBridge};
pub use supervisor::Supervisor;
pub use xl::{parse_domid, parse_list_verbose, XlAdapter};
