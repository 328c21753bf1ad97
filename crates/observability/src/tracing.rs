//! Tracing/logging initialization.
//!
//! JSON lines on stdout, filtered by `RUST_LOG`. When `RUST_LOG` is unset or
//! unparsable the supplied default directives apply.

use tracing_subscriber::EnvFilter;

/// Storefront crates at `debug`, everything else at `info`.
pub const DEFAULT_FILTER: &str = "info,storefront_api=debug,storefront_infra=debug";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_current_span(false)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        ::tracing::debug!(default_filter, "tracing initialised");
    }
}
