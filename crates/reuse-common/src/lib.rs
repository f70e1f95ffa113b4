//! ReUse Exchange common utilities
//!
//! - `logging` - tracing subscriber setup shared by every binary
//! - `patch` - tri-state field type for partial updates

pub mod logging;
pub mod patch;

pub use patch::{NullNotAllowed, Patch};
