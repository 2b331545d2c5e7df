//! # Views: client-facing handles attached to a shared link or lane.
//!
//! A [`View`] is what a client holds; many views share one
//! [`LinkModel`](crate::LinkModel). The model's relays call the observer methods
//! below for every transport event, and the view decides whether it can finish
//! on the relay's current thread or needs its own [`Stage`](crate::Stage).
//!
//! ## Contract
//! - Observer methods receive `preemptive`. When `true` they may return
//!   [`Progress::Pending`] to ask for a continuation on [`View::stage`]; when
//!   `false` they are already there and must finish.
//! - An `Err` aborts the rest of the relay after [`View::did_fail`] has seen it.
//! - Observers may be called after the view was detached or closed, because a
//!   relay delivers to the snapshot it took at creation.

use std::sync::Arc;

use crate::error::TierError;
use crate::relay::StageRef;

/// Outcome of one observer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Handling for this view and phase is finished.
    Complete,
    /// Resume this view on its own stage, non-preemptively.
    Pending,
}

/// Client-facing handle attached to a shared link or lane model.
pub trait View: Send + Sync + 'static {
    /// Human-readable name (for logs and errors).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Execution context this view's continuations run on.
    fn stage(&self) -> StageRef;

    fn on_connect(&self, _preemptive: bool) -> Result<Progress, TierError> {
        Ok(Progress::Complete)
    }

    fn on_disconnect(&self, _preemptive: bool) -> Result<Progress, TierError> {
        Ok(Progress::Complete)
    }

    fn on_close(&self, _preemptive: bool) -> Result<Progress, TierError> {
        Ok(Progress::Complete)
    }

    fn on_fail(&self, _error: &TierError, _preemptive: bool) -> Result<Progress, TierError> {
        Ok(Progress::Complete)
    }

    /// The view's own failure callback; sees every error its observers raise.
    fn did_fail(&self, _error: &TierError) {}

    /// Called once the view is attached and its model is open.
    fn open_view(&self) {}

    /// Called when the view is detached, drained or reset.
    fn close_view(&self) {}
}

/// Shared handle to a view.
pub type ViewRef = Arc<dyn View>;

/// True when both handles point at the same view instance.
#[inline]
pub fn same_view(a: &ViewRef, b: &ViewRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
