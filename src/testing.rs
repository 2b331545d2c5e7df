//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::TierError;
use crate::lifecycle::{Step, TierHooks};
use crate::links::{Progress, View, ViewRef};
use crate::relay::{QueueStage, StageRef};

/// Hook set that records every `will`/`did` as `"will:open"`, `"did:open"`, ...
#[derive(Default)]
pub(crate) struct Journal {
    entries: Mutex<Vec<String>>,
    failures: AtomicUsize,
}

impl Journal {
    pub(crate) fn will(&self, step: Step) {
        self.push(format!("will:{step}"));
    }

    pub(crate) fn did(&self, step: Step) {
        self.push(format!("did:{step}"));
    }

    pub(crate) fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Every `will:<step>` has exactly one `did:<step>` right after it.
    pub(crate) fn assert_balanced(&self) {
        let entries = self.entries();
        assert_eq!(entries.len() % 2, 0, "odd hook count: {entries:?}");
        for pair in entries.chunks(2) {
            let will = pair[0].strip_prefix("will:");
            let did = pair[1].strip_prefix("did:");
            assert!(will.is_some() && will == did, "unpaired hooks: {pair:?}");
        }
    }
}

impl TierHooks for Journal {
    fn will(&self, step: Step) {
        Journal::will(self, step);
    }

    fn did(&self, step: Step) {
        Journal::did(self, step);
    }

    fn did_fail(&self, _error: &TierError) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test view that records every callback and can defer, fail or panic on demand.
pub(crate) struct Witness {
    name: String,
    stage: StageRef,
    defer: bool,
    fail: Option<String>,
    panic: bool,
    log: Journal,
    shared: Option<Arc<Journal>>,
}

impl Witness {
    /// A witness whose stage drops anything handed to it.
    pub(crate) fn new(name: &str) -> Self {
        let (stage, _queue) = QueueStage::new(format!("{name}-stage"));
        Self::on_stage(name, Arc::new(stage))
    }

    pub(crate) fn on_stage(name: &str, stage: StageRef) -> Self {
        Self {
            name: name.to_string(),
            stage,
            defer: false,
            fail: None,
            panic: false,
            log: Journal::default(),
            shared: None,
        }
    }

    /// Ask for a continuation whenever called preemptively.
    pub(crate) fn deferring(mut self) -> Self {
        self.defer = true;
        self
    }

    pub(crate) fn failing(mut self, reason: &str) -> Self {
        self.fail = Some(reason.to_string());
        self
    }

    pub(crate) fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    /// Also record `"<name>:<entry>"` into `journal`.
    pub(crate) fn sharing(mut self, journal: &Arc<Journal>) -> Self {
        self.shared = Some(Arc::clone(journal));
        self
    }

    pub(crate) fn into_view(self) -> ViewRef {
        Arc::new(self)
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.log.entries()
    }

    fn record(&self, entry: &str) {
        self.log.push(entry.to_string());
        if let Some(shared) = &self.shared {
            shared.push(format!("{}:{entry}", self.name));
        }
    }

    fn observe(&self, event: &str, preemptive: bool) -> Result<Progress, TierError> {
        if self.panic {
            panic!("witness {} exploded", self.name);
        }
        if let Some(reason) = &self.fail {
            return Err(TierError::observer(self.name.clone(), reason.clone()));
        }
        if self.defer && preemptive {
            self.record(&format!("defer:{event}"));
            return Ok(Progress::Pending);
        }
        self.record(event);
        Ok(Progress::Complete)
    }
}

impl View for Witness {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> StageRef {
        Arc::clone(&self.stage)
    }

    fn on_connect(&self, preemptive: bool) -> Result<Progress, TierError> {
        self.observe("connect", preemptive)
    }

    fn on_disconnect(&self, preemptive: bool) -> Result<Progress, TierError> {
        self.observe("disconnect", preemptive)
    }

    fn on_close(&self, preemptive: bool) -> Result<Progress, TierError> {
        self.observe("close", preemptive)
    }

    fn on_fail(&self, _error: &TierError, preemptive: bool) -> Result<Progress, TierError> {
        self.observe("fail", preemptive)
    }

    fn did_fail(&self, error: &TierError) {
        self.record(&format!("did_fail:{}", error.as_label()));
    }

    fn open_view(&self) {
        self.record("open");
    }

    fn close_view(&self) {
        self.record("closed");
    }
}
