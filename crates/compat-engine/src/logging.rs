//! Logging setup

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns false if a global subscriber was already installed, so calling
/// this more than once is harmless.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
