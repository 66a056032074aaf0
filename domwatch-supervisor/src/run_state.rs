//! Control state shared between the monitoring loop and signal delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Run-control flags for one supervisor process.
///
/// Shared behind an `Arc` between the loop and the
/// [`SignalBridge`](crate::SignalBridge). Signal delivery only ever writes
/// the two flags; the loop reads them and clears the termination request.
#[derive(Debug)]
pub struct RunState {
    running: AtomicBool,
    term_received: AtomicBool,
    period: Duration,
    wake: Notify,
}

impl RunState {
    /// Create a running state with the given poll period.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            running: AtomicBool::new(true),
            term_received: AtomicBool::new(false),
            period,
            wake: Notify::new(),
        }
    }

    /// Poll period between iterations.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the loop should keep iterating.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request the loop to stop and wake any idle wait.
    ///
    /// `running` only ever goes from true to false. Returns `true` for the
    /// call that performed that transition.
    pub fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.wake.notify_one();
        was_running
    }

    /// Record a termination request for the loop to act on.
    pub fn request_term(&self) {
        self.term_received.store(true, Ordering::SeqCst);
    }

    /// Whether a termination request is pending.
    #[must_use]
    pub fn term_received(&self) -> bool {
        self.term_received.load(Ordering::SeqCst)
    }

    /// Consume a pending termination request. A request that arrives after
    /// this call stays pending for the next iteration.
    pub fn take_term(&self) -> bool {
        self.term_received.swap(false, Ordering::SeqCst)
    }

    /// Sleep for `duration`, returning early if [`stop`](Self::stop) is called.
    pub async fn idle(&self, duration: Duration) {
        if !self.is_running() {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.wake.notified() => {}
        }
    }
}
