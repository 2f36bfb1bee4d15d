//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, unless one is already set.
pub fn init_tracing() {
    init_tracing_with("warn");
}

/// Like [`init_tracing`], but falls back to `default_directive` when `RUST_LOG`
/// is unset or unparsable (e.g. `"ordered_pool=debug"`).
pub fn init_tracing_with(default_directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
