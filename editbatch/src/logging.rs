//! Diagnostic tracing for the CLI.
//!
//! Output goes to stderr so that JSON results on stdout stay machine-readable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. When unset, defaults to `info` with `verbose` and `warn`
/// otherwise. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=editbatch=debug editbatch run batch.json
/// ```
pub fn init(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
