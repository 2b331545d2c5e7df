//! # Phases, states and steps of the lifecycle ratchet.
//!
//! A tier is always at one of twelve [`State`]s and is asked to converge on one
//! of four ordered [`Phase`]s:
//!
//! ```text
//!            Opening           Loading            Starting
//!   Closed ───────────► Opened ───────────► Loaded ───────────► Started
//!      ▲                 ▲  │                ▲  │                  │
//!      │    Closing      │  │   Unloading    │  │    Stopping      │
//!      └─────────────────┘  └──► Unloaded ───┘  └───── Stopped ◄───┘
//! ```
//!
//! Four states are stable (`Closed`, `Opened`, `Loaded`, `Started`). The other
//! eight are transitional: the six working states, each of which carries a
//! [`Step`] with its `will`/`did` hooks, plus `Stopped` and `Unloaded`, which a
//! finished downward step passes through before the next decision is taken.

use std::fmt;

/// Ordered readiness level a tier is asked to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Phase {
    /// Nothing is held open.
    #[default]
    Closed = 0,
    /// Resources are open but not loaded.
    Opened = 1,
    /// State is loaded but the tier is not serving.
    Loaded = 2,
    /// Fully running.
    Started = 3,
}

impl Phase {
    pub(crate) const fn from_bits(bits: u32) -> Phase {
        match bits & 0b11 {
            0 => Phase::Closed,
            1 => Phase::Opened,
            2 => Phase::Loaded,
            _ => Phase::Started,
        }
    }

    /// Returns a short lowercase name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Closed => "closed",
            Phase::Opened => "opened",
            Phase::Loaded => "loaded",
            Phase::Started => "started",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a tier in the twelve-value ratchet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum State {
    #[default]
    Closed = 0,
    Opening = 1,
    Opened = 2,
    Loading = 3,
    Loaded = 4,
    Starting = 5,
    Started = 6,
    Stopping = 7,
    Stopped = 8,
    Unloading = 9,
    Unloaded = 10,
    Closing = 11,
}

impl State {
    pub(crate) fn from_bits(bits: u32) -> State {
        match bits {
            0 => State::Closed,
            1 => State::Opening,
            2 => State::Opened,
            3 => State::Loading,
            4 => State::Loaded,
            5 => State::Starting,
            6 => State::Started,
            7 => State::Stopping,
            8 => State::Stopped,
            9 => State::Unloading,
            10 => State::Unloaded,
            11 => State::Closing,
            other => unreachable!("lifecycle state bits out of range: {other}"),
        }
    }

    /// True for the four states a tier can rest in.
    pub const fn is_stable(self) -> bool {
        matches!(
            self,
            State::Closed | State::Opened | State::Loaded | State::Started
        )
    }

    /// The phase a stable state satisfies.
    pub const fn stable_phase(self) -> Option<Phase> {
        match self {
            State::Closed => Some(Phase::Closed),
            State::Opened => Some(Phase::Opened),
            State::Loaded => Some(Phase::Loaded),
            State::Started => Some(Phase::Started),
            _ => None,
        }
    }

    /// The hook-bearing step this state performs, if any.
    pub const fn step(self) -> Option<Step> {
        match self {
            State::Opening => Some(Step::Open),
            State::Loading => Some(Step::Load),
            State::Starting => Some(Step::Start),
            State::Stopping => Some(Step::Stop),
            State::Unloading => Some(Step::Unload),
            State::Closing => Some(Step::Close),
            _ => None,
        }
    }

    /// The transitional state adjacent to this stable state in the direction of `target`.
    ///
    /// Returns `None` when this state is transitional or already satisfies `target`.
    pub fn begin_toward(self, target: Phase) -> Option<State> {
        let here = self.stable_phase()?;
        if target > here {
            match self {
                State::Closed => Some(State::Opening),
                State::Opened => Some(State::Loading),
                State::Loaded => Some(State::Starting),
                _ => None,
            }
        } else if target < here {
            match self {
                State::Started => Some(State::Stopping),
                State::Loaded => Some(State::Unloading),
                State::Opened => Some(State::Closing),
                _ => None,
            }
        } else {
            None
        }
    }

    /// The state that follows once this transitional state has finished, given the
    /// currently desired phase. Stable states map to themselves.
    pub fn successor(self, phase: Phase) -> State {
        match self {
            State::Opening => match phase {
                Phase::Closed => State::Closing,
                Phase::Opened => State::Opened,
                _ => State::Loading,
            },
            State::Loading => match phase {
                Phase::Started => State::Starting,
                Phase::Loaded => State::Loaded,
                _ => State::Unloading,
            },
            State::Starting => match phase {
                Phase::Started => State::Started,
                _ => State::Stopping,
            },
            State::Stopping => State::Stopped,
            State::Stopped => match phase {
                Phase::Started => State::Starting,
                Phase::Loaded => State::Loaded,
                _ => State::Unloading,
            },
            State::Unloading => State::Unloaded,
            State::Unloaded => match phase {
                Phase::Closed => State::Closing,
                Phase::Opened => State::Opened,
                _ => State::Loading,
            },
            State::Closing => match phase {
                Phase::Closed => State::Closed,
                _ => State::Opening,
            },
            stable => stable,
        }
    }

    /// `Closed` only; a closing tier is not yet closed.
    pub const fn is_closed(self) -> bool {
        matches!(self, State::Closed)
    }

    /// `Opened` or anything further along, up to `Unloaded`.
    pub const fn is_opened(self) -> bool {
        let n = self as u8;
        n >= State::Opened as u8 && n <= State::Unloaded as u8
    }

    /// `Loaded` or anything further along, up to `Stopped`.
    pub const fn is_loaded(self) -> bool {
        let n = self as u8;
        n >= State::Loaded as u8 && n <= State::Stopped as u8
    }

    /// `Started` only.
    pub const fn is_started(self) -> bool {
        matches!(self, State::Started)
    }
}

/// A hook-bearing step of the ratchet; each fires `will` then `did`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Open,
    Load,
    Start,
    Stop,
    Unload,
    Close,
}

impl Step {
    /// The phase a child is asked to reach when this step cascades to it.
    pub const fn target(self) -> Phase {
        match self {
            Step::Open => Phase::Opened,
            Step::Load => Phase::Loaded,
            Step::Start => Phase::Started,
            Step::Stop => Phase::Loaded,
            Step::Unload => Phase::Opened,
            Step::Close => Phase::Closed,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Step::Open => "open",
            Step::Load => "load",
            Step::Start => "start",
            Step::Stop => "stop",
            Step::Unload => "unload",
            Step::Close => "close",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
