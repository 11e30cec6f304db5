//! Tracing and logging setup shared by every gatekeeper binary.

/// Initialize process-wide observability (tracing/logging).
///
/// `default_filter` applies when `RUST_LOG` is unset or invalid. Safe to call
/// multiple times; subsequent calls are no-ops.
pub fn init(default_filter: &str) {
    tracing::init(default_filter);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
