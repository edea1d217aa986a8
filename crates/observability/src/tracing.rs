//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

pub(crate) fn filter_or(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a JSON subscriber for the process.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(default_filter: &str) -> bool {
    // One JSON object per event, without span context.
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter_or(default_filter))
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .try_init()
        .is_ok()
}
