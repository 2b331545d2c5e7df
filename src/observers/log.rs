//! # Simple logging view for debugging and demos.
//!
//! [`LogView`] attaches to a [`LinkModel`](crate::LinkModel) like any client
//! view and writes every event it is handed through `tracing::info!`.
//!
//! ## Output format
//! ```text
//! [open] view=audit
//! [connect] view=audit preemptive=true
//! [fail] view=audit err="transport failed: reset" preemptive=true
//! [disconnect] view=audit preemptive=true
//! [close] view=audit preemptive=true
//! [closed] view=audit
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use tierlink::{LinkModel, LogView, TierKind, TokioStage};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lane = LinkModel::new(TierKind::Lane, "lane", ());
//! lane.attach(Arc::new(LogView::new("audit", Arc::new(TokioStage::current("log")))));
//! lane.on_connected();
//! # }
//! ```

use std::sync::Arc;

use crate::error::TierError;
use crate::links::{Progress, View};
use crate::relay::StageRef;

/// Logging view.
///
/// Enabled via the `logging` feature. Never defers and never fails.
///
/// Not intended for production use; implement a custom [`View`] for structured
/// event handling.
pub struct LogView {
    name: Arc<str>,
    stage: StageRef,
}

impl LogView {
    pub fn new(name: impl Into<Arc<str>>, stage: StageRef) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }
}

impl View for LogView {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> StageRef {
        Arc::clone(&self.stage)
    }

    fn on_connect(&self, preemptive: bool) -> Result<Progress, TierError> {
        tracing::info!("[connect] view={} preemptive={preemptive}", self.name);
        Ok(Progress::Complete)
    }

    fn on_disconnect(&self, preemptive: bool) -> Result<Progress, TierError> {
        tracing::info!("[disconnect] view={} preemptive={preemptive}", self.name);
        Ok(Progress::Complete)
    }

    fn on_close(&self, preemptive: bool) -> Result<Progress, TierError> {
        tracing::info!("[close] view={} preemptive={preemptive}", self.name);
        Ok(Progress::Complete)
    }

    fn on_fail(&self, error: &TierError, preemptive: bool) -> Result<Progress, TierError> {
        tracing::info!(
            "[fail] view={} err={:?} preemptive={preemptive}",
            self.name,
            error.to_string()
        );
        Ok(Progress::Complete)
    }

    fn did_fail(&self, error: &TierError) {
        tracing::info!("[did-fail] view={} err={:?}", self.name, error.as_message());
    }

    fn open_view(&self) {
        tracing::info!("[open] view={}", self.name);
    }

    fn close_view(&self) {
        tracing::info!("[closed] view={}", self.name);
    }
}
