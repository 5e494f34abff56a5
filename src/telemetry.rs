//! Tracing subscriber setup for binaries and tests that embed the reasoner.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "PAGI_HYBRID_LOG";

/// Installs a fmt subscriber filtered by [`LOG_ENV`] (default `info`).
///
/// Returns `false` when a global subscriber was already installed, which leaves the existing
/// one in place.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    init_with(filter)
}

/// Installs a fmt subscriber with an explicit filter directive, e.g. `"pagi_hybrid_reasoner=debug"`.
pub fn init_tracing_with_filter(filter: &str) -> bool {
    init_with(EnvFilter::new(filter))
}

fn init_with(filter: EnvFilter) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .is_ok()
}
