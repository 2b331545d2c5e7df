//! # Relays and the stages they run on.
//!
//! - [`Stage`], [`StageTask`], [`TokioStage`], [`QueueStage`] execution contexts
//! - [`Relay`], [`Broadcast`], [`RelayOwner`] the resumable per-event dispatcher

mod dispatch;
mod stage;

pub use dispatch::{Broadcast, Relay, RelayOwner};
pub use stage::{QueueStage, Stage, StageQueue, StageRef, StageTask, TokioStage, same_stage};
