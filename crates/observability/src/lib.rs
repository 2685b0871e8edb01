//! Tracing/logging setup shared by the binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{DEFAULT_FILTER, LogFormat, init};
