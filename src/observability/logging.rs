//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Honor `RUST_LOG` first, then the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the fmt subscriber on stdout. Later calls are ignored.
pub fn init_logging(level: &str) {
    let installed = tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

/// Same as [`init_logging`] but writes to stderr, leaving stdout for output.
pub fn init_stderr_logging(level: &str) {
    let installed = tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("elation_dispatch={level},tower_http={level}")))
}
