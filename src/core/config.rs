//! # Edge runtime configuration.
//!
//! Provides [`EdgeConfig`] the settings [`Edge::run`](crate::Edge::run) works from.
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for stage work on shutdown

use std::time::Duration;

use crate::lifecycle::Phase;

/// Configuration for the edge runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for stage work to finish after the root closed (`0s` = no wait)
/// - `target`: Phase the root tier is driven to when the edge runs
/// - `handle_signals`: Whether OS termination signals trigger shutdown
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors over
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct EdgeConfig {
    /// Maximum time to wait for stage work once the root tier has closed.
    ///
    /// If the stage still has running tasks when it elapses,
    /// `Edge::run` returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Phase requested on the root tier at startup.
    pub target: Phase,

    /// Listen for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere).
    ///
    /// When `false` only the edge's cancellation token stops it.
    pub handle_signals: bool,
}

impl EdgeConfig {
    /// Returns the shutdown grace period as an `Option`.
    ///
    /// - `None` → do not wait
    /// - `Some(d)` → wait up to `d`
    #[inline]
    pub fn shutdown_grace(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }
}

impl Default for EdgeConfig {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `target = Phase::Started`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            target: Phase::Started,
            handle_signals: true,
        }
    }
}
