//! Edge runtime: drives the root tier and owns the shared stage.
//!
//! The public API from this module is [`Edge`], its [`EdgeBuilder`] and
//! [`EdgeConfig`].
//!
//! Internal modules:
//! - [`edge`]: runs the root tier until shutdown, then drains the stage;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod edge;
mod shutdown;

pub use builder::EdgeBuilder;
pub use config::EdgeConfig;
pub use edge::Edge;
