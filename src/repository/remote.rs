//! Remote-backed repository for one namespace.
//!
//! # Responsibilities
//! - Load the first snapshot: remote with bounded retries, then local cache, then empty
//! - Re-fetch on notifications and periodic refresh, one fetch in flight at a time
//! - Diff accepted snapshots, write them through to the cache, tell subscribers
//!
//! # Sync Coalescing
//! ```text
//! trigger → requested = true
//!         → in_flight false→true?  yes: drain (fetch while requested.swap(false))
//!                                  no:  the running drain picks it up
//! ```
//! A trigger arriving mid-fetch costs exactly one follow-up fetch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::LocalCacheStore;
use crate::config::ClientConfig;
use crate::discovery::ServiceLocator;
use crate::http::HttpClient;
use crate::model::{diff_properties, ConfigSnapshot, Namespace, Properties, SourceType};
use crate::remote::{FetchError, FetchOutcome, NotificationClient, NotificationHandler, NotificationState, RemoteFetcher};
use crate::resilience::{retry_with_backoff, RetryOutcome, RetryPolicy};
use crate::view::source::{notify_listeners, PropertySource, SourceListener};

/// Collaborators shared by every repository of a registry.
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    pub http: Arc<dyn HttpClient>,
    pub services: Arc<ServiceLocator>,
    pub fetcher: Arc<RemoteFetcher>,
    pub cache: LocalCacheStore,
    pub config: Arc<ClientConfig>,
}

impl RepositoryContext {
    pub fn new(http: Arc<dyn HttpClient>, cache: LocalCacheStore, config: Arc<ClientConfig>) -> Self {
        let services = Arc::new(ServiceLocator::new(http.clone(), &config));
        let fetcher = Arc::new(RemoteFetcher::new(http.clone(), services.clone(), &config));
        Self {
            http,
            services,
            fetcher,
            cache,
            config,
        }
    }
}

/// Single source of truth for one namespace.
#[derive(Debug)]
pub struct RemoteConfigRepository {
    me: Weak<RemoteConfigRepository>,
    namespace: Namespace,
    name: String,
    fetcher: Arc<RemoteFetcher>,
    notifications: Arc<NotificationClient>,
    cache: LocalCacheStore,
    retry: RetryPolicy,
    current: ArcSwap<ConfigSnapshot>,
    source: Mutex<SourceType>,
    listeners: Mutex<Vec<Weak<dyn SourceListener>>>,
    sync_requested: AtomicBool,
    sync_in_flight: AtomicBool,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl RemoteConfigRepository {
    /// Create an unloaded repository. Its tasks stop when `parent` is cancelled.
    pub fn new(namespace: Namespace, ctx: &RepositoryContext, parent: &CancellationToken) -> Arc<Self> {
        let state = Arc::new(NotificationState::new());
        let notifications = Arc::new(NotificationClient::new(
            namespace.clone(),
            ctx.http.clone(),
            ctx.services.clone(),
            &ctx.config,
            state,
        ));

        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            name: namespace.to_string(),
            namespace,
            fetcher: ctx.fetcher.clone(),
            notifications,
            cache: ctx.cache.clone(),
            retry: RetryPolicy::from(&ctx.config.retries),
            current: ArcSwap::from_pointee(ConfigSnapshot::empty()),
            source: Mutex::new(SourceType::None),
            listeners: Mutex::new(Vec::new()),
            sync_requested: AtomicBool::new(false),
            sync_in_flight: AtomicBool::new(false),
            started: AtomicBool::new(false),
            cancel: parent.child_token(),
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn notification_state(&self) -> &Arc<NotificationState> {
        self.notifications.state()
    }

    /// Load the first snapshot. Always leaves the repository usable.
    pub async fn initialize(&self) {
        let messages = self.notification_state().messages();
        let (fetcher, namespace, messages) = (&self.fetcher, &self.namespace, &messages);

        let outcome = retry_with_backoff(
            &self.retry,
            &self.cancel,
            move |_| fetcher.fetch(namespace, None, Some(messages)),
            FetchError::is_retryable,
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded {
                value: FetchOutcome::Snapshot(snapshot),
                attempts,
            } => {
                tracing::info!(
                    namespace = %self.namespace,
                    release_key = %snapshot.release_key,
                    keys = snapshot.configurations.len(),
                    attempts,
                    "Loaded config from remote"
                );
                self.cache.write(&self.namespace, &snapshot, &self.cancel).await;
                self.install(snapshot, SourceType::Remote);
                return;
            }
            RetryOutcome::Succeeded {
                value: FetchOutcome::NotModified,
                ..
            } => {
                tracing::warn!(namespace = %self.namespace, "Unconditional fetch answered 304");
            }
            RetryOutcome::Failed {
                error: error @ FetchError::NamespaceNotFound(_),
                ..
            } => {
                tracing::warn!(namespace = %self.namespace, error = %error, "Namespace not published, trying local cache");
            }
            RetryOutcome::Failed { error, attempts } => {
                tracing::error!(
                    namespace = %self.namespace,
                    error = %error,
                    attempts,
                    "Remote load exhausted retries, trying local cache"
                );
            }
            RetryOutcome::Cancelled { .. } => {
                tracing::debug!(namespace = %self.namespace, "Initial load cancelled");
            }
        }

        match self.cache.read(&self.namespace).await {
            Some(snapshot) => self.install(snapshot, SourceType::LocalCache),
            None => {
                tracing::warn!(namespace = %self.namespace, "No remote or cached config, starting empty");
                self.install(ConfigSnapshot::empty(), SourceType::None);
            }
        }
    }

    /// Spawn the long-poll loop. Later calls are no-ops.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::AcqRel) {
            return None;
        }
        let handler: Arc<dyn NotificationHandler> = self.me.upgrade()?;
        let client = self.notifications.clone();
        let cancel = self.cancel.clone();
        Some(tokio::spawn(async move { client.run(handler, cancel).await }))
    }

    /// Stop background work. The last snapshot stays readable.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request a re-fetch without waiting for it.
    pub fn trigger_sync(&self) {
        let Some(this) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move { this.sync().await });
    }

    /// Request a re-fetch and, unless one is already running, perform it.
    pub async fn sync(&self) {
        self.sync_requested.store(true, Ordering::Release);

        loop {
            if self
                .sync_in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            while self.sync_requested.swap(false, Ordering::AcqRel) {
                if self.cancel.is_cancelled() {
                    break;
                }
                self.sync_once().await;
            }

            self.sync_in_flight.store(false, Ordering::Release);

            // A trigger may have landed between the last swap and the release above.
            if !self.sync_requested.load(Ordering::Acquire) || self.cancel.is_cancelled() {
                return;
            }
        }
    }

    async fn sync_once(&self) {
        let previous = self.current.load_full();
        let messages = self.notification_state().messages();
        let (fetcher, namespace, previous_ref, messages) = (&self.fetcher, &self.namespace, previous.as_ref(), &messages);

        let outcome = retry_with_backoff(
            &self.retry,
            &self.cancel,
            move |_| fetcher.fetch(namespace, Some(previous_ref), Some(messages)),
            FetchError::is_retryable,
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded {
                value: FetchOutcome::Snapshot(snapshot),
                ..
            } => self.accept(&previous, snapshot).await,
            RetryOutcome::Succeeded {
                value: FetchOutcome::NotModified,
                ..
            } => {
                tracing::debug!(namespace = %self.namespace, "Config not modified");
                self.mark_remote();
            }
            RetryOutcome::Failed {
                error: FetchError::NamespaceNotFound(_),
                ..
            } => {
                tracing::debug!(namespace = %self.namespace, "Namespace still not published");
            }
            RetryOutcome::Failed { error, attempts } => {
                tracing::warn!(
                    namespace = %self.namespace,
                    error = %error,
                    attempts,
                    "Config sync failed, keeping current snapshot"
                );
            }
            RetryOutcome::Cancelled { .. } => {}
        }
    }

    async fn accept(&self, previous: &ConfigSnapshot, mut snapshot: ConfigSnapshot) {
        snapshot.changes = diff_properties(&previous.configurations, &snapshot.configurations);
        self.cache.write(&self.namespace, &snapshot, &self.cancel).await;

        if snapshot.changes.is_empty() {
            tracing::debug!(namespace = %self.namespace, release_key = %snapshot.release_key, "Release carried no property changes");
            self.current.store(Arc::new(snapshot));
            self.mark_remote();
            return;
        }

        tracing::info!(
            namespace = %self.namespace,
            release_key = %snapshot.release_key,
            changed = snapshot.changes.len(),
            "Config changed"
        );
        self.install(snapshot, SourceType::Remote);
        notify_listeners(&self.listeners, &self.name);
    }

    fn install(&self, snapshot: ConfigSnapshot, source: SourceType) {
        self.current.store(Arc::new(snapshot));
        *self.source.lock() = source;
    }

    fn mark_remote(&self) {
        *self.source.lock() = SourceType::Remote;
    }
}

impl NotificationHandler for RemoteConfigRepository {
    fn on_notified(&self, _namespace: &Namespace, _notification_id: i64) {
        self.trigger_sync();
    }
}

impl PropertySource for RemoteConfigRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Properties {
        self.current.load().configurations.clone()
    }

    fn source_type(&self) -> SourceType {
        *self.source.lock()
    }

    fn subscribe(&self, listener: Weak<dyn SourceListener>) {
        self.listeners.lock().push(listener);
    }
}
