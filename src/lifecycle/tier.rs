//! # Tiers: lifecycle-driven resources that cascade into a nested child.
//!
//! A [`Tier`] pairs a [`LifecycleStatus`] register with a [`TierHooks`]
//! implementation and an optional nested child. Every tier kind (edge, mesh,
//! part, host, node, lane) uses the same machinery; what differs is the hooks.
//!
//! ## Convergence
//! ```text
//! start() ──► status.request(Started)
//!               ├─ stable & behind ─► won CAS into Opening ─► drive(Opening)
//!               └─ transitional     ─► phase updated only; the owner re-reads it
//!
//! drive(state):
//!   loop {
//!     ├─► hooks.will(step) ──► child.request(step.target())
//!     ├─► hooks.did(step)
//!     ├─► next = status.advance(state)   (fresh phase, CAS)
//!     └─► next stable? ──► settle, return
//!   }
//! ```
//!
//! ## Rules
//! - Only the caller that wins the CAS into a transitional state drives it, so
//!   hooks of one tier never run concurrently with each other.
//! - Hooks may call lifecycle operations on their own tier; while a transition is
//!   in flight that only moves the desired phase, and the loop may reverse.
//! - Cascading into the child is push-based: a child attached mid-transition is
//!   brought up to the parent's level but is not committed atomically with it.
//! - [`Lifecycle::did_fail`] never changes state.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::phase::{Phase, State, Step};
use super::status::{LifecycleStatus, Status};
use crate::error::TierError;

/// The contract every lifecycle-driven resource exposes, including nested children.
///
/// Implementors provide [`request`](Lifecycle::request), [`state`](Lifecycle::state)
/// and [`did_fail`](Lifecycle::did_fail); the six named operations and four queries
/// are derived from them.
pub trait Lifecycle: Send + Sync + 'static {
    /// Asks the resource to converge on `phase`.
    fn request(&self, phase: Phase);

    /// Current position in the ratchet (lock-free read).
    fn state(&self) -> State;

    /// Reports a failure. Does not change state.
    fn did_fail(&self, error: &TierError);

    fn open(&self) {
        self.request(Phase::Opened);
    }

    fn load(&self) {
        self.request(Phase::Loaded);
    }

    fn start(&self) {
        self.request(Phase::Started);
    }

    fn stop(&self) {
        self.request(Phase::Loaded);
    }

    fn unload(&self) {
        self.request(Phase::Opened);
    }

    fn close(&self) {
        self.request(Phase::Closed);
    }

    fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    fn is_opened(&self) -> bool {
        self.state().is_opened()
    }

    fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }

    fn is_started(&self) -> bool {
        self.state().is_started()
    }
}

/// Shared handle to any lifecycle-driven resource.
pub type TierRef = Arc<dyn Lifecycle>;

/// Callbacks fired by a [`Tier`] as it moves through the ratchet.
///
/// All methods default to no-ops; `()` is the empty hook set.
pub trait TierHooks: Send + Sync + 'static {
    /// Fired once the transitional state for `step` has been committed.
    fn will(&self, _step: Step) {}

    /// Fired when the work for `step` is done, before the state moves on.
    fn did(&self, _step: Step) {}

    /// Fired by [`Lifecycle::did_fail`].
    fn did_fail(&self, _error: &TierError) {}
}

impl TierHooks for () {}

/// Level of the hierarchy a tier sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    Edge,
    Mesh,
    Part,
    Host,
    Node,
    Lane,
}

impl TierKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            TierKind::Edge => "edge",
            TierKind::Mesh => "mesh",
            TierKind::Part => "part",
            TierKind::Host => "host",
            TierKind::Node => "node",
            TierKind::Lane => "lane",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Child(TierRef);

/// A lifecycle-driven resource with its own hooks and at most one nested child.
pub struct Tier<H = ()> {
    name: Arc<str>,
    kind: TierKind,
    status: LifecycleStatus,
    hooks: H,
    child: ArcSwapOption<Child>,
}

impl<H: TierHooks> Tier<H> {
    /// Creates a closed tier.
    pub fn new(kind: TierKind, name: impl Into<Arc<str>>, hooks: H) -> Self {
        Self {
            name: name.into(),
            kind,
            status: LifecycleStatus::new(),
            hooks,
            child: ArcSwapOption::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TierKind {
        self.kind
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// State and desired phase read together.
    pub fn status(&self) -> Status {
        self.status.load()
    }

    /// Raises the desired phase to `floor` unless it is already at or above it.
    pub fn request_at_least(&self, floor: Phase) {
        if let Some(state) = self.status.request_at_least(floor) {
            self.drive(state);
        }
    }

    /// The current nested child, if any.
    pub fn child(&self) -> Option<TierRef> {
        self.child.load_full().map(|c| Arc::clone(&c.0))
    }

    /// Installs `child`, closing the one it replaces.
    ///
    /// The new child is asked to reach the level this tier rests at or, while a
    /// step is in flight, that step's target; later steps of the transition
    /// cascade into it as usual.
    pub fn set_child(&self, child: TierRef) -> Option<TierRef> {
        let previous = self.child.swap(Some(Arc::new(Child(Arc::clone(&child)))));
        if let Some(prev) = &previous {
            prev.0.close();
        }
        // Mid-transition, the step in flight already cascaded into the old child only.
        let state = self.status.state();
        let level = match (state.stable_phase(), state.step()) {
            (Some(Phase::Closed), _) => None,
            (Some(settled), _) => Some(settled),
            (None, Some(step)) => Some(step.target()),
            (None, None) if state == State::Stopped => Some(Phase::Loaded),
            (None, None) => Some(Phase::Opened),
        };
        if let Some(phase) = level {
            child.request(phase);
        }
        previous.map(|c| Arc::clone(&c.0))
    }

    /// Removes the nested child without touching its lifecycle.
    pub fn take_child(&self) -> Option<TierRef> {
        self.child.swap(None).map(|c| Arc::clone(&c.0))
    }

    fn cascade(&self, step: Step) {
        if let Some(child) = self.child.load_full() {
            child.0.request(step.target());
        }
    }

    fn drive(&self, mut state: State) {
        loop {
            let step = state.step();
            if let Some(step) = step {
                tracing::trace!(tier = %self.name, kind = %self.kind, %step, "will");
                self.hooks.will(step);
                self.cascade(step);
                self.hooks.did(step);
                tracing::trace!(tier = %self.name, kind = %self.kind, %step, "did");
            }
            let next = self.status.advance(state);
            if next.is_stable() {
                tracing::debug!(tier = %self.name, kind = %self.kind, state = ?next, "settled");
                return;
            }
            state = next;
        }
    }
}

impl<H: TierHooks> Lifecycle for Tier<H> {
    fn request(&self, phase: Phase) {
        if let Some(state) = self.status.request(phase) {
            self.drive(state);
        }
    }

    fn state(&self) -> State {
        self.status.state()
    }

    fn did_fail(&self, error: &TierError) {
        tracing::warn!(
            tier = %self.name,
            kind = %self.kind,
            label = error.as_label(),
            error = %error,
            "tier failed"
        );
        self.hooks.did_fail(error);
    }
}

impl<H> fmt::Debug for Tier<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tier")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("status", &self.status.load())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{OnceLock, Weak};

    use super::*;
    use crate::testing::Journal;

    fn tier(name: &str) -> Tier<Journal> {
        Tier::new(TierKind::Node, name, Journal::default())
    }

    #[test]
    fn test_start_from_closed_runs_every_upward_step() {
        let t = tier("node");
        t.start();
        assert_eq!(
            t.hooks().entries(),
            [
                "will:open",
                "did:open",
                "will:load",
                "did:load",
                "will:start",
                "did:start"
            ]
        );
        assert!(t.is_opened() && t.is_loaded() && t.is_started());
        assert!(!t.is_closed());
    }

    #[test]
    fn test_close_from_started_runs_every_downward_step() {
        let t = tier("node");
        t.start();
        t.hooks().clear();
        t.close();
        assert_eq!(
            t.hooks().entries(),
            [
                "will:stop",
                "did:stop",
                "will:unload",
                "did:unload",
                "will:close",
                "did:close"
            ]
        );
        assert!(t.is_closed());
        assert!(!t.is_opened() && !t.is_loaded() && !t.is_started());
    }

    #[test]
    fn test_repeated_request_is_idempotent() {
        let t = tier("node");
        t.open();
        t.open();
        assert_eq!(t.hooks().entries(), ["will:open", "did:open"]);
        assert_eq!(t.state(), State::Opened);
    }

    #[test]
    fn test_stop_and_unload_settle_mid_ratchet() {
        let t = tier("node");
        t.start();
        t.stop();
        assert_eq!(t.state(), State::Loaded);
        t.unload();
        assert_eq!(t.state(), State::Opened);
        t.load();
        assert_eq!(t.state(), State::Loaded);
    }

    struct Reverser {
        journal: Journal,
        me: OnceLock<Weak<Tier<Reverser>>>,
    }

    impl TierHooks for Reverser {
        fn will(&self, step: Step) {
            self.journal.will(step);
            if step == Step::Open {
                if let Some(me) = self.me.get().and_then(Weak::upgrade) {
                    me.close();
                }
            }
        }

        fn did(&self, step: Step) {
            self.journal.did(step);
        }
    }

    #[test]
    fn test_reentrant_request_reverses_direction() {
        let t = Arc::new(Tier::new(
            TierKind::Lane,
            "lane",
            Reverser {
                journal: Journal::default(),
                me: OnceLock::new(),
            },
        ));
        let _ = t.hooks().me.set(Arc::downgrade(&t));

        t.start();
        assert_eq!(
            t.hooks().journal.entries(),
            ["will:open", "did:open", "will:close", "did:close"]
        );
        assert_eq!(
            t.status(),
            Status {
                state: State::Closed,
                phase: Phase::Closed
            }
        );
    }

    /// Installs `child` from inside `did(Open)`, after the open step has cascaded.
    struct Adopter {
        me: OnceLock<Weak<Tier<Adopter>>>,
        child: OnceLock<TierRef>,
    }

    impl TierHooks for Adopter {
        fn did(&self, step: Step) {
            if step != Step::Open {
                return;
            }
            let me = self.me.get().and_then(Weak::upgrade);
            if let (Some(me), Some(child)) = (me, self.child.get()) {
                me.set_child(Arc::clone(child));
            }
        }
    }

    #[test]
    fn test_child_installed_mid_transition_reaches_target() {
        let parent = Arc::new(Tier::new(
            TierKind::Node,
            "node",
            Adopter {
                me: OnceLock::new(),
                child: OnceLock::new(),
            },
        ));
        let _ = parent.hooks().me.set(Arc::downgrade(&parent));
        let child = Arc::new(tier("lane"));
        let _ = parent.hooks().child.set(child.clone());

        parent.open();
        assert_eq!(parent.state(), State::Opened);
        assert_eq!(child.state(), State::Opened);
        assert_eq!(child.hooks().entries(), ["will:open", "did:open"]);
    }

    #[test]
    fn test_child_installed_mid_transition_follows_later_steps() {
        let parent = Arc::new(Tier::new(
            TierKind::Node,
            "node",
            Adopter {
                me: OnceLock::new(),
                child: OnceLock::new(),
            },
        ));
        let _ = parent.hooks().me.set(Arc::downgrade(&parent));
        let child = Arc::new(tier("lane"));
        let _ = parent.hooks().child.set(child.clone());

        parent.start();
        assert!(parent.is_started());
        assert_eq!(
            child.hooks().entries(),
            [
                "will:open",
                "did:open",
                "will:load",
                "did:load",
                "will:start",
                "did:start"
            ]
        );
    }

    #[test]
    fn test_child_follows_parent() {
        let parent = tier("host");
        let child = Arc::new(tier("node"));
        parent.set_child(child.clone());

        parent.start();
        assert!(child.is_started());
        parent.stop();
        assert_eq!(child.state(), State::Loaded);
        parent.close();
        assert!(child.is_closed());
    }

    #[test]
    fn test_child_attached_late_catches_up() {
        let parent = tier("host");
        parent.load();
        let child = Arc::new(tier("node"));
        assert!(parent.set_child(child.clone()).is_none());
        assert_eq!(child.state(), State::Loaded);
        assert_eq!(
            child.hooks().entries(),
            ["will:open", "did:open", "will:load", "did:load"]
        );
    }

    #[test]
    fn test_replaced_child_is_closed() {
        let parent = tier("host");
        let first = Arc::new(tier("a"));
        let second = Arc::new(tier("b"));
        parent.set_child(first.clone());
        parent.start();

        let previous = parent.set_child(second.clone()).expect("had a child");
        assert_eq!(
            Arc::as_ptr(&previous) as *const (),
            Arc::as_ptr(&first) as *const ()
        );
        assert!(first.is_closed());
        assert!(second.is_started());

        let taken = parent.take_child();
        assert!(taken.is_some());
        parent.close();
        assert!(second.is_started(), "taken child no longer cascades");
    }

    #[test]
    fn test_did_fail_does_not_move_state() {
        // A failed tier stays put until someone closes it.
        let t = tier("node");
        t.load();
        t.did_fail(&TierError::transport("reset"));
        assert_eq!(t.state(), State::Loaded);
        assert_eq!(t.hooks().failures(), 1);

        t.close();
        assert!(t.is_closed());
    }

    #[test]
    fn test_concurrent_requests_settle_on_requested_phase() {
        const PHASES: [Phase; 4] = [Phase::Closed, Phase::Opened, Phase::Loaded, Phase::Started];

        for round in 0..32 {
            let t = tier("race");
            std::thread::scope(|s| {
                for worker in 0..4 {
                    let t = &t;
                    s.spawn(move || {
                        for i in 0..50 {
                            t.request(PHASES[(round + worker * 7 + i * 3) % 4]);
                        }
                    });
                }
            });

            let status = t.status();
            assert!(status.state.is_stable(), "round {round}: {status:?}");
            assert_eq!(status.state.stable_phase(), Some(status.phase));
            t.hooks().assert_balanced();
        }
    }
}
