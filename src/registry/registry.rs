//! Per-namespace view registry.
//!
//! # Responsibilities
//! - Hand out exactly one `ConfigView` per namespace, created on first use
//! - Run one shared periodic refresh over every repository it created
//! - Apply reloaded client configuration to discovery
//!
//! # Design Decisions
//! - Concurrent first calls for one namespace share a single initial load
//! - The map shard lock is released before any await
//! - `get` never fails; an unreachable service yields a cached or empty view

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;

use crate::cache::LocalCacheStore;
use crate::config::ClientConfig;
use crate::http::HttpClient;
use crate::lifecycle::Shutdown;
use crate::model::Namespace;
use crate::registry::builder::ConfigRegistryBuilder;
use crate::repository::{RemoteConfigRepository, RepositoryContext};
use crate::view::{ConfigView, PropertySource};

/// Thread-safe factory and cache of live configuration views.
#[derive(Debug)]
pub struct ConfigRegistry {
    ctx: RepositoryContext,
    fallbacks: HashMap<String, Vec<Arc<dyn PropertySource>>>,
    views: DashMap<Namespace, Arc<OnceCell<Arc<ConfigView>>>>,
    repositories: Arc<Mutex<Vec<Arc<RemoteConfigRepository>>>>,
    refresh_interval: Duration,
    refresh_started: AtomicBool,
    shutdown: Shutdown,
}

impl ConfigRegistry {
    pub fn builder(config: ClientConfig) -> ConfigRegistryBuilder {
        ConfigRegistryBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        cache: LocalCacheStore,
        fallbacks: HashMap<String, Vec<Arc<dyn PropertySource>>>,
    ) -> Self {
        let refresh_interval = Duration::from_secs(config.refresh.interval_secs.max(1));
        tracing::info!(
            app_id = %config.app_id,
            cluster = %config.cluster,
            env = %config.env,
            cache = cache.is_enabled(),
            "Config registry created"
        );
        Self {
            ctx: RepositoryContext::new(http, cache, Arc::new(config)),
            fallbacks,
            views: DashMap::new(),
            repositories: Arc::new(Mutex::new(Vec::new())),
            refresh_interval,
            refresh_started: AtomicBool::new(false),
            shutdown: Shutdown::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }

    /// View of `namespace` in the configured app and cluster.
    pub async fn get(&self, namespace: &str) -> Arc<ConfigView> {
        let namespace = Namespace::new(
            self.ctx.config.app_id.as_str(),
            self.ctx.config.cluster.as_str(),
            namespace,
        );
        self.get_namespace(namespace).await
    }

    /// View of a fully qualified namespace. Created and loaded on first call.
    pub async fn get_namespace(&self, namespace: Namespace) -> Arc<ConfigView> {
        let cell = self
            .views
            .entry(namespace.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_init(|| self.create_view(namespace)).await.clone()
    }

    /// Views created so far.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.views
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Re-fetch every namespace now, in the background.
    pub fn refresh_all(&self) {
        for repository in self.repositories.lock().iter() {
            repository.trigger_sync();
        }
    }

    /// Apply the hot-reloadable parts of a new configuration.
    pub fn apply_client_config(&self, config: &ClientConfig) {
        self.ctx.services.apply_config(config);
        tracing::info!("Client configuration applied");
    }

    /// Apply every configuration received on `updates` until shutdown.
    pub fn spawn_config_reload(self: &Arc<Self>, mut updates: mpsc::UnboundedReceiver<ClientConfig>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let cancel = self.shutdown.child();
        tokio::spawn(async move {
            loop {
                let config = tokio::select! {
                    config = updates.recv() => config,
                    _ = cancel.cancelled() => break,
                };
                let (Some(config), Some(registry)) = (config, registry.upgrade()) else {
                    break;
                };
                registry.apply_client_config(&config);
            }
            tracing::debug!("Config reload task stopped");
        })
    }

    /// Stop long polls, refresh and reload tasks. Views stay readable.
    pub fn shutdown(&self) {
        if self.shutdown.is_triggered() {
            return;
        }
        self.shutdown.trigger();
        tracing::info!(namespaces = self.repositories.lock().len(), "Config registry shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    async fn create_view(&self, namespace: Namespace) -> Arc<ConfigView> {
        let repository = RemoteConfigRepository::new(namespace.clone(), &self.ctx, self.shutdown.token());
        repository.initialize().await;

        let mut sources: Vec<Arc<dyn PropertySource>> = vec![repository.clone()];
        if let Some(fallbacks) = self.fallbacks.get(namespace.name()) {
            sources.extend(fallbacks.iter().cloned());
        }
        let view = ConfigView::new(namespace.clone(), sources);

        if !self.shutdown.is_triggered() {
            repository.start();
            self.repositories.lock().push(repository);
            self.ensure_refresh_task();
        }

        tracing::info!(
            namespace = %namespace,
            source = ?view.source_type(),
            keys = view.get_property_names().len(),
            "Config view ready"
        );
        view
    }

    fn ensure_refresh_task(&self) {
        if self.refresh_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let repositories = Arc::downgrade(&self.repositories);
        let cancel = self.shutdown.child();
        let period = self.refresh_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel.cancelled() => break,
                }
                let Some(repositories) = repositories.upgrade() else {
                    break;
                };
                let due: Vec<_> = repositories.lock().clone();
                tracing::debug!(namespaces = due.len(), "Periodic config refresh");
                for repository in due {
                    repository.trigger_sync();
                }
            }
            tracing::debug!("Periodic refresh stopped");
        });
    }
}

impl Drop for ConfigRegistry {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
