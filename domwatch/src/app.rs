//! Startup sequence and hand-off to the monitoring loop.
//!
//! Each step maps its failure onto a distinct exit code through
//! [`SupervisorError::exit_code`]: argument and privilege problems first,
//! then hypervisor context, then the initial domain lookup.

use std::sync::Arc;

use domwatch_core::ManagedDomain;
use domwatch_supervisor::{
    ActionExecutor, RunState, SignalBridge, Supervisor, SupervisorError, XlAdapter, XlCreateLauncher,
};
use tracing::info;

use crate::cli::Args;

/// Run domwatch to completion.
///
/// # Errors
/// Returns the [`SupervisorError`] that ended the process.
pub async fn run(args: &Args) -> Result<(), SupervisorError> {
    let policy = args.policy()?;
    ensure_privileged()?;

    let run_state = Arc::new(RunState::new(args.period()));
    let _signals = SignalBridge::install(Arc::clone(&run_state), policy.terminate_gracefully)?;

    let executor = ActionExecutor::new(
        XlAdapter::new(args.xl.clone()),
        XlCreateLauncher::new(args.xl.clone()),
    )
    .with_readiness(args.readiness());
    let domain = ManagedDomain::new(args.name.clone(), args.config.clone());
    let mut supervisor = Supervisor::new(executor, domain, policy, Arc::clone(&run_state));

    let id = supervisor.start().await?;
    info!(
        domain = %args.name,
        domid = %id,
        period_secs = args.period,
        policy = ?policy,
        "monitoring domain"
    );

    supervisor.run().await
}

/// Hypervisor control through the toolstack requires root.
fn ensure_privileged() -> Result<(), SupervisorError> {
    if nix::unistd::geteuid().is_root() {
        Ok(())
    } else {
        Err(SupervisorError::InsufficientPrivilege)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[tokio::test]
    async fn invalid_policy_fails_before_touching_hypervisor() {
        if std::env::var_os("DOMWATCH_CONFIG").is_some() {
            return;
        }
        let args = match Args::try_parse_from(["domwatch", "-n", "guest", "--xl", "/nonexistent/xl"]) {
            Ok(a) => a,
            Err(e) => panic!("arguments must parse: {e}"),
        };
        match run(&args).await {
            Err(SupervisorError::Policy(_)) => {}
            other => panic!("expected policy error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_toolstack_maps_to_context_init_exit_code() {
        if !nix::unistd::geteuid().is_root() {
            return;
        }
        let args = match Args::try_parse_from(["domwatch", "-n", "guest", "-R", "--xl", "/nonexistent/xl"]) {
            Ok(a) => a,
            Err(e) => panic!("arguments must parse: {e}"),
        };
        match run(&args).await {
            Err(e) => assert_eq!(e.exit_code(), 2),
            Ok(()) => panic!("run must fail without a toolstack"),
        }
    }
}
