use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

fn filter_from_env() -> EnvFilter {
    grokpipe_local::env::env("GROKPIPE_LOG")
        .or_else(|| grokpipe_local::env::env("RUST_LOG"))
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Writes to stderr: stdout carries the MCP transport
/// and CLI output.
pub(crate) fn init() {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);
    let _ = tracing_subscriber::registry()
        .with(filter_from_env())
        .with(layer)
        .try_init();
}
