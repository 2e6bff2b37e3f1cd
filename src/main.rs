//! Elation dispatch server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http (axum, session cookie, request id)
//!                          │
//!                          ▼
//!                     App::handle ──▶ ConfigResolver ◀── ConfigStore ◀── ConfigWatcher
//!                          │                                (arc-swap)      (notify)
//!                          ▼
//!                     Dispatcher ──▶ ComponentRegistry ──▶ Component (blog, ...)
//!                          │                                   │
//!                          │                                   ▼
//!                          │                          Services (ORM, templates)
//!                          ▼
//!     ◀────────────── http response (html / json / jsonp / redirect)
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use elation_dispatch::config::loader::load_config;
use elation_dispatch::config::watcher::ConfigWatcher;
use elation_dispatch::lifecycle::signals::spawn_signal_handler;
use elation_dispatch::observability::{logging, metrics};
use elation_dispatch::{App, AppConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "elation-dispatch")]
#[command(about = "Component dispatch server", long_about = None)]
struct Cli {
    /// Application config file
    #[arg(short, long, default_value = "config/app.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        AppConfig::default()
    };
    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = %config.app.version, "elation-dispatch starting");
    tracing::info!(
        config_file = %cli.config.display(),
        bind_address = %config.server.bind_address,
        default_cobrand = %config.app.default_cobrand,
        role = %config.app.role,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = App::from_config(&config)?;

    // Keep the watcher alive for the life of the server
    let (_watcher, config_updates) = if config.app.watch_config {
        let (watcher, updates) = ConfigWatcher::new(Path::new(&config.app.config_dir), config.settings.clone());
        (Some(watcher.run()?), updates)
    } else {
        let (_tx, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(std::sync::Arc::new(app), &config.server);
    server.run(listener, config_updates, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
