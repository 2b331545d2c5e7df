//! # Views, the registry that holds them, and the shared model they attach to.
//!
//! - [`View`], [`Progress`] the client-facing handle and its observer contract
//! - [`ViewRegistry`], [`Views`] the lock-free Empty / One / Many registry
//! - [`LinkModel`], [`Backend`], [`LinkEvent`] one backend shared by many views

mod model;
mod registry;
mod view;

pub use model::{Backend, LinkEvent, LinkModel, RelayStats};
pub use registry::{Attach, Detach, ViewRegistry, Views};
pub use view::{Progress, View, ViewRef, same_view};
