//! The application-facing configuration object.
//!
//! # Responsibilities
//! - Merge an ordered list of sources; earlier sources win per key
//! - Keep key order: the primary source's keys, then keys only later sources have
//! - Serve lock-free reads from an atomically swapped merged map
//! - Diff the merged view on every source change and dispatch events
//!
//! # Design Decisions
//! - Recompute, diff and dispatch happen under one update lock so listeners
//!   see events in the order the changes were applied
//! - Listeners run on the task that applied the change and should return quickly

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::model::{diff_properties, ConfigFileFormat, Namespace, Properties, SourceType};
use crate::view::event::{ConfigChangeEvent, ConfigChangeListener, Interest, ListenerId, RegisteredListener};
use crate::view::source::{PropertySource, SourceListener};

/// Key holding the raw document of non-properties namespaces.
pub const CONTENT_KEY: &str = "content";

/// Merged properties plus their key order. Swapped as one value.
#[derive(Debug, Default)]
struct Merged {
    properties: Properties,
    names: Vec<String>,
}

#[derive(Debug)]
pub struct ConfigView {
    namespace: Namespace,
    sources: Vec<Arc<dyn PropertySource>>,
    merged: ArcSwap<Merged>,
    listeners: Mutex<Vec<RegisteredListener>>,
    next_listener_id: AtomicU64,
    update_lock: Mutex<()>,
}

impl ConfigView {
    /// Build a view over `sources` (highest priority first) and subscribe to them.
    pub fn new(namespace: Namespace, sources: Vec<Arc<dyn PropertySource>>) -> Arc<Self> {
        let merged = merge(&sources);
        let view = Arc::new(Self {
            namespace,
            sources,
            merged: ArcSwap::from_pointee(merged),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            update_lock: Mutex::new(()),
        });

        for source in &view.sources {
            let listener: Weak<ConfigView> = Arc::downgrade(&view);
            source.subscribe(listener);
        }
        view
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.merged.load().properties.get(key).cloned()
    }

    /// Value of `key`, or `default` when absent.
    pub fn get_property(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Every key, without duplicates: the primary source's keys in its order,
    /// then keys that only lower-priority sources define.
    pub fn get_property_names(&self) -> Vec<String> {
        self.merged.load().names.clone()
    }

    /// Copy of the whole merged map.
    pub fn properties(&self) -> Properties {
        self.merged.load().properties.clone()
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.parsed(key, default)
    }

    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        self.parsed(key, default)
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.parsed(key, default)
    }

    /// `true`/`false`, case-insensitive.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    tracing::warn!(namespace = %self.namespace, key, value = %value, "Not a boolean, using default");
                    default
                }
            },
            None => default,
        }
    }

    /// Split the value on `delimiter`. An empty value yields an empty list.
    pub fn get_array(&self, key: &str, delimiter: &str, default: Vec<String>) -> Vec<String> {
        match self.get(key) {
            Some(value) if value.is_empty() => Vec::new(),
            Some(value) if delimiter.is_empty() => vec![value],
            Some(value) => value.split(delimiter).map(str::to_string).collect(),
            None => default,
        }
    }

    /// Raw document for file-format namespaces; `key=value` lines for properties.
    pub fn file_content(&self) -> Option<String> {
        if self.format().is_file_content() {
            return self.get(CONTENT_KEY);
        }
        let merged = self.merged.load();
        if merged.names.is_empty() {
            return None;
        }
        Some(
            merged
                .names
                .iter()
                .filter_map(|k| merged.properties.get(k).map(|v| format!("{}={}\n", k, v)))
                .collect(),
        )
    }

    pub fn format(&self) -> ConfigFileFormat {
        self.namespace.format()
    }

    /// Origin of the primary source's data.
    pub fn source_type(&self) -> SourceType {
        self.sources
            .first()
            .map(|s| s.source_type())
            .unwrap_or(SourceType::None)
    }

    pub fn add_change_listener(&self, listener: Arc<dyn ConfigChangeListener>) -> ListenerId {
        self.add_change_listener_with(listener, Interest::all())
    }

    /// Register a listener that only fires when a changed key matches `interest`.
    pub fn add_change_listener_with(&self, listener: Arc<dyn ConfigChangeListener>, interest: Interest) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(RegisteredListener { id, interest, listener });
        id
    }

    /// Returns false if `id` was not registered.
    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Recompute the merged view and dispatch the resulting event, if any.
    pub fn refresh(&self) {
        let _guard = self.update_lock.lock();

        let old = self.merged.load_full();
        let new = merge(&self.sources);
        let deltas = diff_properties(&old.properties, &new.properties);
        if deltas.is_empty() {
            if old.names != new.names {
                self.merged.store(Arc::new(new));
            }
            return;
        }
        self.merged.store(Arc::new(new));

        let event = ConfigChangeEvent::new(self.namespace.clone(), deltas);
        let listeners: Vec<RegisteredListener> = self.listeners.lock().clone();
        for registered in listeners.iter().filter(|l| l.interest.matches(&event)) {
            registered.listener.on_change(&event);
        }
        tracing::debug!(namespace = %self.namespace, changed = event.changes.len(), "Dispatched change event");
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(namespace = %self.namespace, key, value = %value, "Unparseable value, using default");
                default
            }),
            None => default,
        }
    }
}

impl SourceListener for ConfigView {
    fn on_source_change(&self, source: &str) {
        tracing::debug!(namespace = %self.namespace, source, "Source changed");
        self.refresh();
    }
}

fn merge(sources: &[Arc<dyn PropertySource>]) -> Merged {
    let mut merged = Merged::default();
    for source in sources {
        for (key, value) in source.properties() {
            if !merged.properties.contains_key(&key) {
                merged.names.push(key.clone());
                merged.properties.insert(key, value);
            }
        }
    }
    merged
}
