//! Tracing setup for the CLI

use tracing_subscriber::EnvFilter;

/// Filter used when `--debug` is passed
pub const DEBUG_FILTER: &str = "mcmafia=debug,mcmafia_cli=debug";

/// Pick the tracing filter: `--debug`, then `RUST_LOG`, then the configured level
pub fn env_filter(debug: bool, configured: &str) -> EnvFilter {
    if debug {
        return EnvFilter::new(DEBUG_FILTER);
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber writing plain text to stderr
pub fn init(debug: bool, configured: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug, configured))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}
