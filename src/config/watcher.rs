//! Configuration file watcher for hot reload.
//!
//! Every change event re-runs [`load_config`], which parses and validates
//! the whole file. Only a configuration that passed validation is sent to
//! the server, which diffs it against the running one and deploys the
//! difference. A file that fails to load is logged and skipped, so the
//! table keeps serving the last good configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServerConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ServerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver the server drains for
    /// validated configurations, in file-change order.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher stops when dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let mut last_sent = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if let Some(new_config) = reload(&path, &mut last_sent) {
                        let _ = tx.send(new_config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and return it if it is valid and differs from `last_sent`.
///
/// Editors often emit several events for one save; repeats of the same
/// content are dropped here rather than diffed into an empty reload.
fn reload(path: &Path, last_sent: &mut Option<ServerConfig>) -> Option<ServerConfig> {
    match load_config(path) {
        Ok(new_config) if last_sent.as_ref() == Some(&new_config) => None,
        Ok(new_config) => {
            tracing::info!(path = ?path, hosts = new_config.hosts.len(), "Config file reloaded");
            *last_sent = Some(new_config.clone());
            Some(new_config)
        }
        Err(e) => {
            tracing::error!(
                path = ?path,
                error = %e,
                "Rejected config reload, keeping current routing table"
            );
            None
        }
    }
}
