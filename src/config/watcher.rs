//! Client configuration file watcher for hot reload.
//!
//! Only meta-server candidates and the config-service override are applied on
//! reload (see `ConfigRegistry::apply_client_config`); identity fields such as
//! `app_id` are fixed for the lifetime of a registry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ClientConfig;

/// A watcher that monitors the client configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ClientConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ClientConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => reload(&path, &tx),
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Client config watcher started");
        Ok(watcher)
    }
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<ClientConfig>) {
    tracing::info!(path = ?path, "Client config change detected, reloading");
    match load_config(path) {
        Ok(config) => {
            if tx.send(config).is_err() {
                tracing::debug!("Config update receiver dropped");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload client config, keeping current configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_sends_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apollo.toml");
        std::fs::write(&path, "app_id = \"app\"\nconfig_service = \"http://config:8080\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        reload(&path, &watcher.update_tx);

        let config = rx.try_recv().unwrap();
        assert_eq!(config.app_id, "app");
    }

    #[test]
    fn test_reload_skips_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apollo.toml");
        std::fs::write(&path, "app_id = \"\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        reload(&path, &watcher.update_tx);

        assert!(rx.try_recv().is_err());
    }
}
