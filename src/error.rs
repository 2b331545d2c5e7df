//! Error types used by tiers, links, relays and the edge runtime.
//!
//! This module defines two main error enums:
//!
//! - [`TierError`]: failures delivered into a tier or link, such as observer errors raised
//!   while a relay runs, and transport failures reported through `on_failed`.
//! - [`RuntimeError`]: errors raised by the [`Edge`](crate::Edge) runtime itself.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Failures observed by tiers and links.
///
/// None of these force a lifecycle transition: a tier that receives one through
/// [`Lifecycle::did_fail`](crate::Lifecycle::did_fail) stays where it is until
/// somebody closes it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    /// A view's observer returned an error while a relay was delivering to it.
    #[error("observer of view {view} failed: {reason}")]
    Observer {
        /// Name of the view whose observer failed.
        view: String,
        /// The underlying error message.
        reason: String,
    },

    /// A view's observer panicked while a relay was delivering to it.
    #[error("observer of view {view} panicked: {info}")]
    ObserverPanicked {
        /// Name of the view whose observer panicked.
        view: String,
        /// Panic payload, when it was a string.
        info: String,
    },

    /// A relay's own phase or completion hook panicked.
    #[error("relay {relay} panicked: {info}")]
    RelayPanicked {
        /// Name of the broadcast being relayed.
        relay: String,
        /// Panic payload, when it was a string.
        info: String,
    },

    /// An observer running non-preemptively asked for another continuation.
    #[error("view {view} stalled in phase {phase} after hand-off")]
    Stalled {
        /// Name of the stalled view.
        view: String,
        /// Relay phase the view stalled in.
        phase: usize,
    },

    /// The underlying transport or storage reported a failure.
    #[error("transport failed: {reason}")]
    Transport {
        /// The underlying error message.
        reason: String,
    },
}

impl TierError {
    /// Builds an [`TierError::Observer`] for the named view.
    pub fn observer(view: impl Into<String>, reason: impl Into<String>) -> Self {
        TierError::Observer {
            view: view.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`TierError::Transport`].
    pub fn transport(reason: impl Into<String>) -> Self {
        TierError::Transport {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tierlink::TierError;
    ///
    /// let err = TierError::transport("connection reset");
    /// assert_eq!(err.as_label(), "tier_transport_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TierError::Observer { .. } => "tier_observer_failed",
            TierError::ObserverPanicked { .. } => "tier_observer_panicked",
            TierError::RelayPanicked { .. } => "tier_relay_panicked",
            TierError::Stalled { .. } => "tier_view_stalled",
            TierError::Transport { .. } => "tier_transport_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TierError::Observer { view, reason } => format!("observer: view={view} {reason}"),
            TierError::ObserverPanicked { view, info } => format!("panic: view={view} {info}"),
            TierError::RelayPanicked { relay, info } => format!("panic: relay={relay} {info}"),
            TierError::Stalled { view, phase } => format!("stalled: view={view} phase={phase}"),
            TierError::Transport { reason } => format!("transport: {reason}"),
        }
    }

    /// Indicates whether the error came from a view rather than the transport.
    pub fn is_observer(&self) -> bool {
        matches!(
            self,
            TierError::Observer { .. } | TierError::ObserverPanicked { .. } | TierError::Stalled { .. }
        )
    }
}

/// # Errors produced by the edge runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some stage work was still running.
    #[error("shutdown timeout {grace:?} exceeded; {pending} stage tasks still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of stage tasks that had not finished.
        pending: usize,
    },

    /// OS signal handlers could not be registered.
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tierlink::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), pending: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, pending } => {
                format!("grace exceeded after {grace:?}; pending stage tasks={pending}")
            }
            RuntimeError::Signal(e) => format!("signal: {e}"),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
