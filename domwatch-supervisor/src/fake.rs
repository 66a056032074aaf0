//! Scripted adapter and launcher used by the unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use domwatch_core::{DomainId, DomainStatus};

use crate::{AdapterError, HypervisorAdapter, LaunchError, ProcessLauncher, RunState};

/// A call made against a fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    Resolve,
    Query(DomainId),
    Destroy(DomainId),
    CooperativeShutdown(DomainId),
    PowerEvent(DomainId),
    Launch(PathBuf),
    Release,
}

/// Shared, timestamped record of calls made against the fakes.
#[derive(Debug, Clone)]
pub struct Journal {
    start: Instant,
    calls: Arc<Mutex<Vec<(Duration, Call)>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self { start: Instant::now(), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    fn record(&self, call: Call) {
        let at = self.start.elapsed();
        self.calls.lock().expect("journal lock poisoned").push((at, call));
    }

    /// Calls in the order they were made.
    pub fn calls(&self) -> Vec<Call> {
        self.entries().into_iter().map(|(_, c)| c).collect()
    }

    /// Calls with their virtual time offset from journal creation.
    pub fn entries(&self) -> Vec<(Duration, Call)> {
        self.calls.lock().expect("journal lock poisoned").clone()
    }

    /// Offset of the first call matching `pred`.
    pub fn time_of(&self, pred: impl Fn(&Call) -> bool) -> Option<Duration> {
        self.entries().into_iter().find(|(_, c)| pred(c)).map(|(t, _)| t)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

/// Adapter answering from scripted queues, falling back to defaults.
#[derive(Debug)]
pub struct ScriptedAdapter {
    journal: Journal,
    resolves: Mutex<VecDeque<Option<DomainId>>>,
    default_resolve: Option<DomainId>,
    statuses: Mutex<VecDeque<Option<DomainStatus>>>,
    default_status: Option<DomainStatus>,
    fail_cooperative: bool,
    fail_power: bool,
    fail_destroy: bool,
    term_on_shutdown: Option<Arc<RunState>>,
}

impl ScriptedAdapter {
    /// Resolves to domain 1 and reports it running, forever.
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            resolves: Mutex::new(VecDeque::new()),
            default_resolve: Some(DomainId(1)),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Some(DomainStatus::running()),
            fail_cooperative: false,
            fail_power: false,
            fail_destroy: false,
            term_on_shutdown: None,
        }
    }

    /// Queue resolution results; `None` means not found.
    pub fn resolving(self, results: impl IntoIterator<Item = Option<DomainId>>) -> Self {
        self.resolves.lock().expect("lock poisoned").extend(results);
        self
    }

    pub fn default_resolve(mut self, id: Option<DomainId>) -> Self {
        self.default_resolve = id;
        self
    }

    /// Queue poll results; `None` means the id is stale.
    pub fn polling(self, results: impl IntoIterator<Item = Option<DomainStatus>>) -> Self {
        self.statuses.lock().expect("lock poisoned").extend(results);
        self
    }

    pub fn default_status(mut self, status: Option<DomainStatus>) -> Self {
        self.default_status = status;
        self
    }

    pub fn failing_cooperative(mut self) -> Self {
        self.fail_cooperative = true;
        self
    }

    pub fn failing_power(mut self) -> Self {
        self.fail_power = true;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    /// Deliver a termination request while a cooperative shutdown is in flight.
    pub fn requesting_term_on_shutdown(mut self, run_state: Arc<RunState>) -> Self {
        self.term_on_shutdown = Some(run_state);
        self
    }
}

fn refused(command: &str) -> AdapterError {
    AdapterError::CommandFailed { command: command.to_owned(), reason: "scripted failure".to_owned() }
}

#[async_trait]
impl HypervisorAdapter for ScriptedAdapter {
    async fn init(&self) -> Result<(), AdapterError> {
        self.journal.record(Call::Init);
        Ok(())
    }

    async fn resolve_identity(&self, name: &str) -> Result<DomainId, AdapterError> {
        self.journal.record(Call::Resolve);
        let next = self.resolves.lock().expect("lock poisoned").pop_front();
        next.unwrap_or(self.default_resolve)
            .ok_or_else(|| AdapterError::NotFound { name: name.to_owned() })
    }

    async fn query_status(&self, id: DomainId) -> Result<DomainStatus, AdapterError> {
        self.journal.record(Call::Query(id));
        let next = self.statuses.lock().expect("lock poisoned").pop_front();
        next.unwrap_or(self.default_status)
            .ok_or_else(|| AdapterError::Stale { id, reason: "scripted".to_owned() })
    }

    async fn destroy(&self, id: DomainId) -> Result<(), AdapterError> {
        self.journal.record(Call::Destroy(id));
        if self.fail_destroy { Err(refused("destroy")) } else { Ok(()) }
    }

    async fn request_cooperative_shutdown(&self, id: DomainId) -> Result<(), AdapterError> {
        self.journal.record(Call::CooperativeShutdown(id));
        if let Some(run_state) = &self.term_on_shutdown {
            run_state.request_term();
        }
        if self.fail_cooperative { Err(refused("shutdown")) } else { Ok(()) }
    }

    async fn send_power_event(&self, id: DomainId) -> Result<(), AdapterError> {
        self.journal.record(Call::PowerEvent(id));
        if self.fail_power { Err(refused("trigger")) } else { Ok(()) }
    }

    async fn release(&self) {
        self.journal.record(Call::Release);
    }
}

/// Launcher that records launches and optionally fails them.
#[derive(Debug)]
pub struct FakeLauncher {
    journal: Journal,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(journal: Journal) -> Self {
        Self { journal, fail: false }
    }

    pub fn failing(journal: Journal) -> Self {
        Self { journal, fail: true }
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn launch(&self, config_path: &Path) -> Result<(), LaunchError> {
        self.journal.record(Call::Launch(config_path.to_owned()));
        if self.fail {
            return Err(LaunchError::Spawn {
                program: PathBuf::from("xl"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted failure"),
            });
        }
        Ok(())
    }
}
