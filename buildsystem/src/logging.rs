//! Tracing setup for the CLI.
//!
//! Diagnostics go to stderr so stdout stays clean for command output
//! (JSON definitions, ARNs) that callers may pipe.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `buildsystem=info,warn`. ANSI colors are
/// disabled on CI.
///
/// # Example
/// ```bash
/// RUST_LOG=buildsystem=debug buildsystem deploy connect connect_web
/// ```
pub fn init(ci: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("buildsystem=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!ci)
                .compact(),
        )
        .init();
}
