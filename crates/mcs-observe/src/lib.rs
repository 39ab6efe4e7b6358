//! Logging setup shared by the control binary and tests.

mod logger;
pub use logger::*;
