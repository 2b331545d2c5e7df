//! # Packed lifecycle register.
//!
//! [`LifecycleStatus`] keeps a tier's current [`State`] and desired [`Phase`] in
//! one `AtomicU32`, so both can be read and replaced together by a single
//! compare-and-swap:
//!
//! ```text
//!  31                     6 5   4 3       0
//! ┌────────────────────────┬─────┬─────────┐
//! │         unused         │phase│  state  │
//! └────────────────────────┴─────┴─────────┘
//! ```
//!
//! ## Rules
//! - Any thread may change the phase at any time through [`LifecycleStatus::request`].
//! - Only the caller that won the CAS into a transitional state may move the
//!   state on, through [`LifecycleStatus::advance`].
//! - Nothing here blocks; every mutation is a CAS retry loop.

use std::sync::atomic::{AtomicU32, Ordering};

use super::phase::{Phase, State};

const STATE_MASK: u32 = 0b1111;
const PHASE_SHIFT: u32 = 4;

/// Decoded view of the register at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub state: State,
    pub phase: Phase,
}

impl Status {
    #[inline]
    const fn pack(self) -> u32 {
        (self.state as u32) | ((self.phase as u32) << PHASE_SHIFT)
    }

    #[inline]
    fn unpack(bits: u32) -> Self {
        Self {
            state: State::from_bits(bits & STATE_MASK),
            phase: Phase::from_bits(bits >> PHASE_SHIFT),
        }
    }
}

/// One atomic word holding a tier's state and desired phase.
#[derive(Debug, Default)]
pub struct LifecycleStatus {
    bits: AtomicU32,
}

impl LifecycleStatus {
    /// Creates a register at `Closed` / `Closed`.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    /// Reads state and phase together.
    #[inline]
    pub fn load(&self) -> Status {
        Status::unpack(self.bits.load(Ordering::Acquire))
    }

    /// Current state only.
    #[inline]
    pub fn state(&self) -> State {
        self.load().state
    }

    fn compare_exchange(&self, current: Status, new: Status) -> Result<Status, Status> {
        self.bits
            .compare_exchange(
                current.pack(),
                new.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(Status::unpack)
            .map_err(Status::unpack)
    }

    /// Sets the desired phase to `target`.
    ///
    /// If the state is stable and does not already satisfy `target`, the adjacent
    /// transitional state is committed in the same CAS and returned: the caller
    /// now owns the transition and must drive it. Otherwise returns `None` and an
    /// in-flight transition (if any) picks the new phase up on its next step.
    pub fn request(&self, target: Phase) -> Option<State> {
        self.request_with(|_| target)
    }

    /// Like [`request`](Self::request), but never lowers the desired phase.
    pub fn request_at_least(&self, floor: Phase) -> Option<State> {
        self.request_with(|phase| phase.max(floor))
    }

    fn request_with(&self, f: impl Fn(Phase) -> Phase) -> Option<State> {
        let mut current = self.load();
        loop {
            let target = f(current.phase);
            let begin = current.state.begin_toward(target);
            let next = Status {
                state: begin.unwrap_or(current.state),
                phase: target,
            };
            if next == current {
                return None;
            }
            match self.compare_exchange(current, next) {
                Ok(_) => return begin,
                Err(actual) => current = actual,
            }
        }
    }

    /// Moves off the owned transitional state `from` toward its successor under
    /// the phase observed at the moment of the winning CAS.
    pub fn advance(&self, from: State) -> State {
        let mut current = self.load();
        loop {
            debug_assert_eq!(current.state, from, "state moved under its owner");
            let next = Status {
                state: from.successor(current.phase),
                phase: current.phase,
            };
            match self.compare_exchange(current, next) {
                Ok(_) => return next.state,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_closed_closed() {
        let s = LifecycleStatus::new();
        assert_eq!(
            s.load(),
            Status {
                state: State::Closed,
                phase: Phase::Closed
            }
        );
    }

    #[test]
    fn test_pack_round_trips_extremes() {
        let st = Status {
            state: State::Closing,
            phase: Phase::Started,
        };
        assert_eq!(Status::unpack(st.pack()), st);
    }

    #[test]
    fn test_request_begins_only_once() {
        let s = LifecycleStatus::new();
        assert_eq!(s.request(Phase::Started), Some(State::Opening));
        // Already transitional: only the phase moves.
        assert_eq!(s.request(Phase::Loaded), None);
        assert_eq!(
            s.load(),
            Status {
                state: State::Opening,
                phase: Phase::Loaded
            }
        );
    }

    #[test]
    fn test_request_same_phase_is_noop() {
        let s = LifecycleStatus::new();
        assert_eq!(s.request(Phase::Closed), None);
        assert_eq!(s.state(), State::Closed);
    }

    #[test]
    fn test_request_at_least_never_lowers() {
        let s = LifecycleStatus::new();
        let owned = s.request(Phase::Started).expect("begins opening");
        assert_eq!(s.request_at_least(Phase::Opened), None);
        assert_eq!(s.load().phase, Phase::Started);
        assert_eq!(s.advance(owned), State::Loading);
    }

    #[test]
    fn test_advance_reads_latest_phase() {
        let s = LifecycleStatus::new();
        let owned = s.request(Phase::Opened).expect("begins opening");
        s.request(Phase::Started);
        assert_eq!(s.advance(owned), State::Loading);
        s.request(Phase::Loaded);
        assert_eq!(s.advance(State::Loading), State::Loaded);
        assert!(s.state().is_stable());
    }
}
