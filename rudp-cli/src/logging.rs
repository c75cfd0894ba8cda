//! Diagnostic output setup
//!
//! Logs go to stderr so stdout carries only the final summary. `RUST_LOG`
//! overrides the level picked from `--verbose`.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
