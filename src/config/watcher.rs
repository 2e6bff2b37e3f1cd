//! Named-config directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config_tables;
use crate::config::store::ConfigTables;
use crate::config::value::ConfigNode;
use crate::observability::metrics;

/// A watcher that monitors the named-config directory for changes.
pub struct ConfigWatcher {
    dir: PathBuf,
    settings: ConfigNode,
    update_tx: mpsc::UnboundedSender<ConfigTables>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// `settings` is carried into every reloaded table as its global tree.
    /// Returns the watcher and a receiver for reloaded tables.
    pub fn new(dir: &Path, settings: ConfigNode) -> (Self, mpsc::UnboundedReceiver<ConfigTables>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                dir: dir.to_path_buf(),
                settings,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the directory in a background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let dir = self.dir.clone();
        let settings = self.settings;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::info!("Config directory change detected, reloading...");
                        match load_config_tables(&dir, settings.clone()) {
                            Ok(tables) => {
                                metrics::record_config_reload("ok");
                                let _ = tx.send(tables);
                            }
                            Err(e) => {
                                metrics::record_config_reload("error");
                                tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = ?self.dir, "Config watcher started");
        Ok(watcher)
    }
}
