//! # Shared link/lane model fronting one backend for many views.
//!
//! A [`LinkModel`] owns a [`ViewRegistry`], a [`Backend`] (the transport or
//! storage it fronts) and a lifecycle [`Tier`]. Registry transitions drive the
//! lifecycle; transport events become [`Relay`]s over the current views.
//!
//! ```text
//! attach(v) ──► registry.attach ─► settle() ─► v.open_view()
//! detach(v) ──► registry.detach ─► v.close_view() ─► settle()
//!
//! settle():
//!   loop {
//!     ├─ views present ─► request_at_least(Opened)   (will(Open): backend.open())
//!     ├─ no views      ─► request(Closed)            (did(Close): backend.close())
//!     └─ registry still as observed? ─► return
//!   }
//!
//! close() / parent cascade ─► drain views ─► request(Closed)
//!
//! on_connected/on_disconnected/on_closed/on_failed(e)
//!        └─► Relay::new(self, registry.snapshot(), LinkEvent::..).begin()
//! ```
//!
//! Whoever changes the registry last also issues the last registry-driven
//! request, after looking at the registry again, so concurrent attaches and
//! detaches leave the model open exactly when views remain. A view attached
//! while an explicit close drains may still be told `close_view` first.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::registry::{Attach, Detach, ViewRegistry, Views};
use super::view::{Progress, View, ViewRef};
use crate::error::TierError;
use crate::lifecycle::{Lifecycle, Phase, State, Status, Step, Tier, TierHooks, TierKind};
use crate::relay::{Broadcast, Relay, RelayOwner};

/// The transport or storage resource a [`LinkModel`] fronts.
///
/// Opened on the first attach and closed once the model has closed.
pub trait Backend: Send + Sync + 'static {
    fn open(&self) {}
    fn close(&self) {}
}

impl Backend for () {}

/// Transport events a link model broadcasts to its views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connect,
    Disconnect,
    Close,
    Fail(TierError),
}

impl LinkEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkEvent::Connect => "connect",
            LinkEvent::Disconnect => "disconnect",
            LinkEvent::Close => "close",
            LinkEvent::Fail(_) => "fail",
        }
    }
}

impl Broadcast for LinkEvent {
    fn run_phase(
        &self,
        view: &dyn View,
        _phase: usize,
        preemptive: bool,
    ) -> Result<Progress, TierError> {
        match self {
            LinkEvent::Connect => view.on_connect(preemptive),
            LinkEvent::Disconnect => view.on_disconnect(preemptive),
            LinkEvent::Close => view.on_close(preemptive),
            LinkEvent::Fail(error) => view.on_fail(error, preemptive),
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

/// Relay accounting of one model.
///
/// Only relays that finished without a hand-off contribute to `sync_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub completed: u64,
    pub sync_time: Duration,
    pub handed_off: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    sync_nanos: AtomicU64,
    handed_off: AtomicU64,
    failed: AtomicU64,
}

/// Lifecycle hooks of a link model: backend and registry wiring.
struct LinkBinding<K> {
    name: Arc<str>,
    views: ViewRegistry,
    backend: K,
    counters: Counters,
}

impl<K: Backend> LinkBinding<K> {
    fn drain(&self) -> Arc<Views> {
        let drained = self.views.take();
        if !drained.is_empty() {
            tracing::debug!(link = %self.name, views = drained.len(), "views drained");
        }
        for view in drained.iter() {
            view.close_view();
        }
        drained
    }
}

impl<K: Backend> TierHooks for LinkBinding<K> {
    fn will(&self, step: Step) {
        if step == Step::Open {
            self.backend.open();
        }
    }

    fn did(&self, step: Step) {
        if step == Step::Close {
            self.backend.close();
        }
    }
}

/// Shared model of one link or lane: many views, one backend.
pub struct LinkModel<K = ()> {
    tier: Tier<LinkBinding<K>>,
}

impl<K: Backend> LinkModel<K> {
    /// Creates a closed model with no views.
    pub fn new(kind: TierKind, name: impl Into<Arc<str>>, backend: K) -> Arc<Self> {
        let name: Arc<str> = name.into();
        let binding = LinkBinding {
            name: Arc::clone(&name),
            views: ViewRegistry::new(),
            backend,
            counters: Counters::default(),
        };
        Arc::new(Self {
            tier: Tier::new(kind, name, binding),
        })
    }

    pub fn name(&self) -> &str {
        self.tier.name()
    }

    pub fn backend(&self) -> &K {
        &self.tier.hooks().backend
    }

    pub fn status(&self) -> Status {
        self.tier.status()
    }

    fn registry(&self) -> &ViewRegistry {
        &self.tier.hooks().views
    }

    /// Current views, in attach order.
    pub fn views(&self) -> Arc<Views> {
        self.registry().snapshot()
    }

    pub fn view_count(&self) -> usize {
        self.registry().len()
    }

    /// Attaches `view`, opening the model if it was the first one.
    pub fn attach(&self, view: ViewRef) -> Attach {
        let outcome = self.registry().attach(Arc::clone(&view));
        match outcome {
            Attach::AlreadyAttached => return outcome,
            Attach::First => {
                tracing::debug!(link = %self.name(), view = %view.name(), "first view attached");
            }
            Attach::Added => {}
        }
        self.settle();
        view.open_view();
        outcome
    }

    /// Detaches `view`, closing the model if it was the last one.
    pub fn detach(&self, view: &ViewRef) -> Detach {
        let outcome = self.registry().detach(view);
        match outcome {
            Detach::NotAttached => return outcome,
            Detach::Last => {
                tracing::debug!(link = %self.name(), view = %view.name(), "last view detached");
            }
            Detach::Removed => {}
        }
        view.close_view();
        self.settle();
        outcome
    }

    /// Brings the lifecycle in line with the registry: open while views are
    /// attached, closed once none are.
    ///
    /// Never lowers an open model that still has views, and never drains.
    fn settle(&self) {
        loop {
            let occupied = !self.registry().is_empty();
            if occupied {
                self.tier.request_at_least(Phase::Opened);
            } else {
                self.tier.request(Phase::Closed);
            }
            if self.registry().is_empty() != occupied {
                return;
            }
            tracing::trace!(link = %self.name(), occupied, "registry changed while settling");
        }
    }

    /// Hard-resets the model: closes every view and the backend, reopens, and
    /// reattaches the same views in their original order.
    ///
    /// The model returns to the phase it was asked for before the reset.
    pub fn reopen(&self) {
        let prior = self.status().phase;
        let views = self.tier.hooks().drain();
        tracing::debug!(link = %self.name(), views = views.len(), phase = %prior, "reopening");
        self.close();
        let target = if views.is_empty() {
            prior
        } else {
            prior.max(Phase::Opened)
        };
        self.request(target);
        for view in views.iter() {
            self.attach(Arc::clone(view));
        }
    }

    /// Removes every view and closes each; the model itself stays where it is.
    pub fn drain_all(&self) -> usize {
        self.tier.hooks().drain().len()
    }

    /// Relay accounting so far.
    pub fn stats(&self) -> RelayStats {
        let c = &self.tier.hooks().counters;
        RelayStats {
            completed: c.completed.load(Ordering::Relaxed),
            sync_time: Duration::from_nanos(c.sync_nanos.load(Ordering::Relaxed)),
            handed_off: c.handed_off.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }

    /// Broadcasts `broadcast` to the views attached right now.
    pub fn relay<B: Broadcast>(self: &Arc<Self>, broadcast: B) {
        let owner: Arc<dyn RelayOwner> = self.clone();
        Relay::new(owner, self.views(), broadcast).begin();
    }

    pub fn on_connected(self: &Arc<Self>) {
        self.relay(LinkEvent::Connect);
    }

    pub fn on_disconnected(self: &Arc<Self>) {
        self.relay(LinkEvent::Disconnect);
    }

    pub fn on_closed(self: &Arc<Self>) {
        self.relay(LinkEvent::Close);
    }

    /// Reports a transport failure to every view. Does not change state.
    pub fn on_failed(self: &Arc<Self>, error: TierError) {
        self.relay(LinkEvent::Fail(error));
    }
}

impl<K: Backend> Lifecycle for LinkModel<K> {
    /// Closing drains every view first; a view attached during the close
    /// reopens the model.
    fn request(&self, phase: Phase) {
        if phase != Phase::Closed {
            self.tier.request(phase);
            return;
        }
        self.tier.hooks().drain();
        self.tier.request(Phase::Closed);
        if !self.registry().is_empty() {
            self.settle();
        }
    }

    fn state(&self) -> State {
        self.tier.state()
    }

    fn did_fail(&self, error: &TierError) {
        self.tier.did_fail(error);
    }
}

impl<K: Backend> RelayOwner for LinkModel<K> {
    fn relay_completed(&self, elapsed: Duration) {
        let c = &self.tier.hooks().counters;
        c.completed.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        c.sync_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn relay_handed_off(&self) {
        self.tier.hooks().counters.handed_off.fetch_add(1, Ordering::Relaxed);
    }

    fn relay_failed(&self, error: &TierError) {
        self.tier.hooks().counters.failed.fetch_add(1, Ordering::Relaxed);
        self.did_fail(error);
    }
}

impl<K: Backend> fmt::Debug for LinkModel<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkModel")
            .field("tier", &self.tier)
            .field("views", &self.tier.hooks().views.len())
            .finish()
    }
}
