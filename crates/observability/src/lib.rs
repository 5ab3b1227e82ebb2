//! Tracing and logging (shared setup).

/// Tracing configuration (filters, layers).
pub mod tracing;
