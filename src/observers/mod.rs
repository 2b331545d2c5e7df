//! Built-in views.

mod log;

pub use log::LogView;
