//! # Lifecycle ratchet shared by every tier and link.
//!
//! ## Contents
//! - [`Phase`], [`State`], [`Step`] the ordered phases, the twelve-value ratchet, and the hook-bearing steps
//! - [`LifecycleStatus`] the packed atomic register (state + desired phase)
//! - [`Lifecycle`], [`TierHooks`], [`Tier`] the contract, its callbacks, and the generic implementation
//!
//! ## Quick wiring
//! ```text
//! Tier<H> { status: LifecycleStatus, hooks: H, child: Option<TierRef> }
//!      └─► open/load/start/stop/unload/close ─► status.request(phase)
//!           └─► drive(): hooks.will ─► child.request ─► hooks.did ─► status.advance
//! ```

mod phase;
mod status;
mod tier;

pub use phase::{Phase, State, Step};
pub use status::{LifecycleStatus, Status};
pub use tier::{Lifecycle, Tier, TierHooks, TierKind, TierRef};
