//! # tierlink
//!
//! **Tierlink** is the concurrency core for a hierarchy of lifecycle-driven
//! resources (edge → mesh → part → host → node → lane) and the shared links
//! that fan transport events out to many client views.
//!
//! It provides three lock-free primitives and the glue between them:
//! a ratcheted lifecycle state machine, a copy-on-write view registry, and a
//! resumable multi-phase relay that can hand itself off between execution
//! contexts mid-delivery.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ Edge (runtime)                                                   │
//!   │  - root: TierRef           (request(target) ... close())         │
//!   │  - stage: TokioStage       (TaskTracker, drained within grace)   │
//!   │  - token: CancellationToken / OS signals                         │
//!   └──────┬───────────────────────────────────────────────────────────┘
//!          ▼ cascade (push-based, one child per tier)
//!     ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────────┐
//!     │ Tier     │──►│ Tier     │──►│ Tier     │──►│ LinkModel (lane) │
//!     │ (edge)   │   │ (mesh)   │   │ (node)   │   │  Tier<binding>   │
//!     └──────────┘   └──────────┘   └──────────┘   │  ViewRegistry    │
//!                                                  │  Backend         │
//!                                                  └───┬──────────┬───┘
//!                            attach / detach / reopen  │          │  on_connected / on_failed(e) / ...
//!                                                      ▼          ▼
//!                                           Empty | One | Many   Relay (snapshot of views)
//!                                                                 ├─ view A: Complete
//!                                                                 ├─ view B: Pending ─► B.stage().execute(relay)
//!                                                                 └─ ... resumed on B's stage
//! ```
//!
//! ### Lifecycle
//! ```text
//! Closed ─► Opening ─► Opened ─► Loading ─► Loaded ─► Starting ─► Started
//!   ▲                    │ ▲                  │ ▲                   │
//!   └──── Closing ◄──────┘ └─ Unloading ◄─────┘ └─── Stopping ◄─────┘
//!
//! per step:  will(step) ─► child.request(step.target()) ─► did(step) ─► CAS to next state
//! ```
//!
//! ## Features
//! | Area           | Description                                                         | Key types / traits                          |
//! |----------------|---------------------------------------------------------------------|---------------------------------------------|
//! | **Lifecycle**  | Lock-free ratchet with hooks and a cascading child.                 | [`Lifecycle`], [`Tier`], [`TierHooks`]       |
//! | **Views**      | Registry of client views over one shared backend.                   | [`View`], [`ViewRegistry`], [`LinkModel`]    |
//! | **Relays**     | Resumable broadcast with cross-stage hand-off.                      | [`Relay`], [`Broadcast`], [`Stage`]          |
//! | **Runtime**    | Root driver with signals and graceful shutdown.                     | [`Edge`], [`EdgeConfig`]                     |
//! | **Errors**     | Typed errors for observers, transports and the runtime.             | [`TierError`], [`RuntimeError`]              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogView`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tierlink::{LinkModel, Lifecycle, Progress, QueueStage, StageRef, TierError, TierKind, View};
//!
//! struct Printer {
//!     stage: StageRef,
//! }
//!
//! impl View for Printer {
//!     fn stage(&self) -> StageRef {
//!         Arc::clone(&self.stage)
//!     }
//!
//!     fn on_connect(&self, _preemptive: bool) -> Result<Progress, TierError> {
//!         println!("connected");
//!         Ok(Progress::Complete)
//!     }
//! }
//!
//! let (stage, _queue) = QueueStage::new("client");
//! let lane = LinkModel::new(TierKind::Lane, "lane", ());
//! let view: Arc<dyn View> = Arc::new(Printer { stage: Arc::new(stage) });
//!
//! lane.attach(Arc::clone(&view)); // first view opens the lane
//! lane.on_connected();            // relays `on_connect` to every view
//! lane.detach(&view);             // last view closes it
//! assert!(lane.is_closed());
//! ```
mod core;
mod error;
mod lifecycle;
mod links;
mod relay;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{Edge, EdgeBuilder, EdgeConfig};
pub use error::{RuntimeError, TierError};
pub use lifecycle::{
    Lifecycle, LifecycleStatus, Phase, State, Status, Step, Tier, TierHooks, TierKind, TierRef,
};
pub use links::{
    Attach, Backend, Detach, LinkEvent, LinkModel, Progress, RelayStats, View, ViewRef,
    ViewRegistry, Views, same_view,
};
pub use relay::{
    Broadcast, QueueStage, Relay, RelayOwner, Stage, StageQueue, StageRef, StageTask, TokioStage,
    same_stage,
};

// Optional: expose a simple built-in logging view (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod observers;
#[cfg(feature = "logging")]
pub use observers::LogView;
