//! Demo scenes for the firstlight engine and a minimal window runtime that
//! presents one of them once.

pub mod runtime;
pub mod scenes;

pub use runtime::{run, DemoConfig};
