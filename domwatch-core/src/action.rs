//! Recovery decisions.
//!
//! [`decide`] is a pure function of one poll result, the pending termination
//! request and the policy. All waiting and hypervisor calls happen later, when
//! the supervisor hands the [`Action`] to its executor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DomainStatus, Policy, ShutdownReason};

/// What the supervisor does in one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing, and re-poll without waiting.
    None,
    /// Ask the guest to shut down (cooperative, then power button).
    GracefulShutdownOnly,
    /// Grace wait, destroy, then launch the creation tool.
    DestroyThenRecreate,
    /// Grace wait, then launch the creation tool without destroying.
    RecreateWithoutDestroy,
    /// Grace wait, destroy, then stop the loop.
    DestroyThenStop,
    /// Grace wait, destroy, then keep polling after one period.
    DestroyThenContinue,
    /// Stop the loop without touching the domain.
    StopOnly,
    /// Wait one period and re-poll.
    NoOpSleep,
}

impl Action {
    /// Whether carrying out this action destroys the domain.
    #[must_use]
    pub fn destroys(self) -> bool {
        matches!(self, Self::DestroyThenRecreate | Self::DestroyThenStop | Self::DestroyThenContinue)
    }

    /// Whether carrying out this action launches the creation tool.
    #[must_use]
    pub fn recreates(self) -> bool {
        matches!(self, Self::DestroyThenRecreate | Self::RecreateWithoutDestroy)
    }

    /// Whether carrying out this action ends the monitoring loop.
    #[must_use]
    pub fn stops(self) -> bool {
        matches!(self, Self::DestroyThenStop | Self::StopOnly)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::GracefulShutdownOnly => "graceful_shutdown_only",
            Self::DestroyThenRecreate => "destroy_then_recreate",
            Self::RecreateWithoutDestroy => "recreate_without_destroy",
            Self::DestroyThenStop => "destroy_then_stop",
            Self::DestroyThenContinue => "destroy_then_continue",
            Self::StopOnly => "stop_only",
            Self::NoOpSleep => "noop_sleep",
        };
        f.write_str(s)
    }
}

/// Choose the action for one iteration.
///
/// A pending termination request always wins over the polled status. A
/// reboot with restart disabled is observed but deliberately left alone, even
/// when destroy is enabled.
#[must_use]
pub fn decide(status: &DomainStatus, term_received: bool, policy: &Policy) -> Action {
    if term_received {
        return if policy.shutdown_enabled { Action::GracefulShutdownOnly } else { Action::None };
    }

    if !status.shutdown {
        return Action::NoOpSleep;
    }

    match status.reason {
        ShutdownReason::Reboot => match (policy.restart_enabled, policy.destroy_enabled) {
            (true, true) => Action::DestroyThenRecreate,
            (true, false) => Action::RecreateWithoutDestroy,
            (false, _) => Action::NoOpSleep,
        },
        ShutdownReason::PowerOff | ShutdownReason::Other | ShutdownReason::None => {
            match (policy.destroy_enabled, policy.ignore_vm_shutdown) {
                (true, false) => Action::DestroyThenStop,
                (true, true) => Action::DestroyThenContinue,
                (false, false) => Action::StopOnly,
                (false, true) => Action::NoOpSleep,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn any_reason() -> impl Strategy<Value = ShutdownReason> {
        prop_oneof![
            Just(ShutdownReason::None),
            Just(ShutdownReason::PowerOff),
            Just(ShutdownReason::Reboot),
            Just(ShutdownReason::Other),
        ]
    }

    fn any_status() -> impl Strategy<Value = DomainStatus> {
        (any::<bool>(), any_reason()).prop_map(|(shutdown, reason)| {
            if shutdown {
                DomainStatus::shut_down(reason)
            } else {
                DomainStatus::running()
            }
        })
    }

    fn any_policy() -> impl Strategy<Value = Policy> {
        proptest::collection::vec(any::<bool>(), 6).prop_map(|f| Policy {
            shutdown_enabled: f[0],
            restart_enabled: f[1],
            destroy_enabled: f[2],
            terminate_gracefully: f[3],
            ignore_vm_shutdown: f[4],
            recover_stale_identity: f[5],
        })
    }

    #[test]
    fn running_domain_sleeps() {
        let action = decide(&DomainStatus::running(), false, &Policy::default());
        assert_eq!(action, Action::NoOpSleep);
    }

    #[test]
    fn reboot_with_defaults_destroys_and_recreates() {
        let status = DomainStatus::shut_down(ShutdownReason::Reboot);
        assert_eq!(decide(&status, false, &Policy::default()), Action::DestroyThenRecreate);
    }

    #[test]
    fn reboot_without_destroy_still_recreates() {
        let policy = Policy { destroy_enabled: false, ..Policy::default() };
        let status = DomainStatus::shut_down(ShutdownReason::Reboot);
        assert_eq!(decide(&status, false, &policy), Action::RecreateWithoutDestroy);
    }

    #[test]
    fn reboot_with_restart_disabled_does_nothing_even_if_destroy_enabled() {
        let policy = Policy { restart_enabled: false, ..Policy::default() };
        let status = DomainStatus::shut_down(ShutdownReason::Reboot);
        assert_eq!(decide(&status, false, &policy), Action::NoOpSleep);
    }

    #[test]
    fn poweroff_with_shutdown_and_destroy_disabled_only_stops() {
        let policy = Policy { shutdown_enabled: false, destroy_enabled: false, ..Policy::default() };
        let status = DomainStatus::shut_down(ShutdownReason::PowerOff);
        assert_eq!(decide(&status, false, &policy), Action::StopOnly);
    }

    #[test]
    fn other_reason_with_ignore_destroys_and_continues() {
        let policy = Policy { ignore_vm_shutdown: true, ..Policy::default() };
        let status = DomainStatus::shut_down(ShutdownReason::Other);
        assert_eq!(decide(&status, false, &policy), Action::DestroyThenContinue);
    }

    #[test]
    fn term_with_shutdown_disabled_takes_no_action() {
        let policy = Policy { shutdown_enabled: false, ..Policy::default() };
        assert_eq!(decide(&DomainStatus::running(), true, &policy), Action::None);
    }

    proptest! {
        #[test]
        fn proptest_decide_is_deterministic(
            status in any_status(),
            term in any::<bool>(),
            policy in any_policy(),
        ) {
            prop_assert_eq!(decide(&status, term, &policy), decide(&status, term, &policy));
        }

        #[test]
        fn proptest_destroy_disabled_never_destroys(
            status in any_status(),
            term in any::<bool>(),
            policy in any_policy(),
        ) {
            let policy = Policy { destroy_enabled: false, ..policy };
            prop_assert!(!decide(&status, term, &policy).destroys());
        }

        #[test]
        fn proptest_term_request_wins_over_status(
            status in any_status(),
            policy in any_policy(),
        ) {
            let action = decide(&status, true, &policy);
            prop_assert!(
                matches!(action, Action::GracefulShutdownOnly | Action::None),
                "term request must be handled before shutdown classification, got {}", action
            );
        }

        #[test]
        fn proptest_ignore_shutdown_never_stops(
            reason in any_reason(),
            policy in any_policy(),
        ) {
            let policy = Policy { ignore_vm_shutdown: true, ..policy };
            let action = decide(&DomainStatus::shut_down(reason), false, &policy);
            prop_assert!(!action.stops());
        }

        #[test]
        fn proptest_restart_disabled_never_recreates(
            status in any_status(),
            term in any::<bool>(),
            policy in any_policy(),
        ) {
            let policy = Policy { restart_enabled: false, ..policy };
            prop_assert!(!decide(&status, term, &policy).recreates());
        }
    }
}
