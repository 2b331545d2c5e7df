//! # Relay: resumable multi-phase broadcast over a view snapshot.
//!
//! A [`Relay`] delivers one [`Broadcast`] to every view of the snapshot it took
//! at creation, phase by phase, without ever blocking the thread that drives it.
//!
//! ## Execution
//! ```text
//! begin() ─► resume() on the caller's thread (stage = none, preemptive = true)
//!
//! pump:
//!   ├─ view_index < len:
//!   │    run_phase(view, phase, preemptive)
//!   │      ├─ Complete                  ─► view_index += 1
//!   │      ├─ Pending & preemptive      ─► preemptive = false
//!   │      │     ├─ view.stage() is ours ─► call again, now non-preemptive
//!   │      │     └─ otherwise            ─► stage = view.stage(); submit self; return
//!   │      └─ Err(e)                    ─► view.did_fail(e); abort relay
//!   ├─ phase + 1 < phase_count ─► end_phase, phase += 1, view_index = 0,
//!   │                             preemptive = true, begin_phase
//!   └─ drained ─► done()
//! ```
//!
//! ## Rules
//! - `(phase, view_index)` only moves forward; each view sees each phase once.
//! - Failing fast: the first observer error skips every remaining view and phase.
//!   Errors never escape [`Relay::begin`]; they go to [`RelayOwner::relay_failed`].
//! - Observer panics are caught at the view boundary and handled as errors;
//!   panics in `begin_phase`, `end_phase` and `done` abort the relay the same way.
//! - Only a relay that finished inside its first run reports its wall time to
//!   [`RelayOwner::relay_completed`]; time spent after a hand-off is not measured.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::stage::{StageRef, StageTask, same_stage};
use crate::error::{TierError, panic_message};
use crate::links::{Progress, View, ViewRef, Views};

/// An event delivered by a relay, possibly in several ordered phases.
pub trait Broadcast: Send + Sync + 'static {
    /// Number of phases; every view sees phase `n` before any view sees `n + 1`.
    fn phase_count(&self) -> usize {
        1
    }

    /// Delivers phase `phase` of this event to `view`.
    fn run_phase(&self, view: &dyn View, phase: usize, preemptive: bool)
    -> Result<Progress, TierError>;

    /// Fired before phase `phase` (for every phase but the first).
    fn begin_phase(&self, _phase: usize) {}

    /// Fired after every view has seen phase `phase` (for every phase but the last).
    fn end_phase(&self, _phase: usize) {}

    /// Fired once every view has seen every phase.
    fn done(&self) {}

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The shared model a relay reports back to.
pub trait RelayOwner: Send + Sync + 'static {
    /// A relay finished without leaving its first run.
    fn relay_completed(&self, _elapsed: Duration) {}

    /// A relay handed itself off to a view's stage.
    fn relay_handed_off(&self) {}

    /// A relay was aborted by `error`.
    fn relay_failed(&self, error: &TierError);
}

enum Pump {
    Done,
    Suspend(StageRef),
}

/// Resumable broadcast of one event over a snapshot of views.
pub struct Relay<B> {
    owner: Arc<dyn RelayOwner>,
    broadcast: B,
    views: Arc<Views>,
    view_index: usize,
    phase: usize,
    phase_count: usize,
    preemptive: bool,
    stage: Option<StageRef>,
    handed_off: bool,
}

impl<B: Broadcast> Relay<B> {
    /// Creates a relay over `views`; nothing runs until [`begin`](Self::begin).
    pub fn new(owner: Arc<dyn RelayOwner>, views: Arc<Views>, broadcast: B) -> Self {
        let phase_count = broadcast.phase_count();
        Self {
            owner,
            broadcast,
            views,
            view_index: 0,
            phase: 0,
            phase_count,
            preemptive: true,
            stage: None,
            handed_off: false,
        }
    }

    /// Runs the relay on the calling thread until it is drained, fails, or
    /// hands itself off to a view's stage.
    pub fn begin(self) {
        Box::new(self).resume();
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    pub fn view_index(&self) -> usize {
        self.view_index
    }

    pub fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    /// True once every phase has been delivered.
    pub fn is_drained(&self) -> bool {
        self.phase >= self.phase_count
    }

    fn resume(mut self: Box<Self>) {
        let started = Instant::now();
        match self.pump() {
            Ok(Pump::Done) => {
                if !self.handed_off {
                    self.owner.relay_completed(started.elapsed());
                }
            }
            Ok(Pump::Suspend(stage)) => {
                tracing::trace!(
                    relay = self.broadcast.name(),
                    stage = stage.name(),
                    phase = self.phase,
                    view_index = self.view_index,
                    "relay handed off"
                );
                self.owner.relay_handed_off();
                stage.execute(self);
            }
            Err(error) => {
                tracing::warn!(
                    relay = self.broadcast.name(),
                    phase = self.phase,
                    view_index = self.view_index,
                    label = error.as_label(),
                    error = %error,
                    "relay aborted"
                );
                self.owner.relay_failed(&error);
            }
        }
    }

    fn pump(&mut self) -> Result<Pump, TierError> {
        loop {
            if self.is_drained() {
                self.guarded(|b| b.done())?;
                return Ok(Pump::Done);
            }
            let Some(view) = self.views.get(self.view_index).cloned() else {
                if self.phase + 1 < self.phase_count {
                    let ended = self.phase;
                    self.guarded(|b| b.end_phase(ended))?;
                    self.view_index = 0;
                    self.phase += 1;
                    self.preemptive = true;
                    let begun = self.phase;
                    self.guarded(|b| b.begin_phase(begun))?;
                } else {
                    self.phase += 1;
                }
                continue;
            };

            match self.deliver(&view) {
                Ok(Progress::Complete) => self.view_index += 1,
                Ok(Progress::Pending) if self.preemptive => {
                    self.preemptive = false;
                    let target = view.stage();
                    let on_target = self
                        .stage
                        .as_ref()
                        .is_some_and(|current| same_stage(current, &target));
                    if !on_target {
                        self.stage = Some(Arc::clone(&target));
                        self.handed_off = true;
                        return Ok(Pump::Suspend(target));
                    }
                }
                Ok(Progress::Pending) => {
                    let stalled = TierError::Stalled {
                        view: view.name().to_string(),
                        phase: self.phase,
                    };
                    tracing::warn!(label = stalled.as_label(), error = %stalled, "treating as complete");
                    self.view_index += 1;
                }
                Err(error) => {
                    let reported = catch_unwind(AssertUnwindSafe(|| view.did_fail(&error)));
                    if let Err(panic_err) = reported {
                        tracing::error!(
                            view = view.name(),
                            info = %panic_message(&*panic_err),
                            "view failure callback panicked"
                        );
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Runs a relay-level hook, turning a panic into an error.
    fn guarded(&self, hook: impl FnOnce(&B)) -> Result<(), TierError> {
        catch_unwind(AssertUnwindSafe(|| hook(&self.broadcast))).map_err(|panic_err| {
            TierError::RelayPanicked {
                relay: self.broadcast.name().to_string(),
                info: panic_message(&*panic_err),
            }
        })
    }

    fn deliver(&self, view: &ViewRef) -> Result<Progress, TierError> {
        let phase = self.phase;
        let preemptive = self.preemptive;
        catch_unwind(AssertUnwindSafe(|| {
            self.broadcast.run_phase(&**view, phase, preemptive)
        }))
        .unwrap_or_else(|panic_err| {
            Err(TierError::ObserverPanicked {
                view: view.name().to_string(),
                info: panic_message(&*panic_err),
            })
        })
    }
}

impl<B: Broadcast> StageTask for Relay<B> {
    fn run(self: Box<Self>) {
        self.resume();
    }
}

impl<B: Broadcast> fmt::Debug for Relay<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("broadcast", &self.broadcast.name())
            .field("views", &self.views.len())
            .field("view_index", &self.view_index)
            .field("phase", &self.phase)
            .field("phase_count", &self.phase_count)
            .field("preemptive", &self.preemptive)
            .field("handed_off", &self.handed_off)
            .finish()
    }
}
