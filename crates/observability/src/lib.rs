//! Shared tracing setup for binaries built on the orgauth crates.
//!
//! Libraries only emit events; installing a subscriber is left to the
//! process entry point.

/// Initialize process-wide structured logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Like [`init`], with a different fallback when `RUST_LOG` is unset.
pub fn init_with_default_filter(default_filter: &str) {
    tracing::init(default_filter);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
