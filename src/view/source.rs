//! Property sources a view is composed from.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::model::{Properties, SourceType};

/// Told when a source's properties changed.
pub trait SourceListener: Send + Sync {
    fn on_source_change(&self, source: &str);
}

/// A named, readable set of properties.
pub trait PropertySource: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Current properties. Must never be a partially updated map.
    fn properties(&self) -> Properties;

    fn source_type(&self) -> SourceType;

    /// Register for change callbacks. Sources that never change may ignore this.
    fn subscribe(&self, listener: Weak<dyn SourceListener>) {
        let _ = listener;
    }
}

/// Notify every live listener, dropping the dead ones.
pub(crate) fn notify_listeners(listeners: &Mutex<Vec<Weak<dyn SourceListener>>>, source: &str) {
    let live: Vec<Arc<dyn SourceListener>> = {
        let mut listeners = listeners.lock();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    };
    for listener in live {
        listener.on_source_change(source);
    }
}

/// An in-memory source, e.g. local overrides or defaults layered under the remote namespace.
#[derive(Debug)]
pub struct MapSource {
    name: String,
    properties: ArcSwap<Properties>,
    listeners: Mutex<Vec<Weak<dyn SourceListener>>>,
}

impl MapSource {
    pub fn new(name: impl Into<String>, properties: Properties) -> Self {
        Self {
            name: name.into(),
            properties: ArcSwap::from_pointee(properties),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(name, pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Swap in new properties and notify subscribers.
    pub fn replace(&self, properties: Properties) {
        self.properties.store(Arc::new(properties));
        notify_listeners(&self.listeners, &self.name);
    }
}

impl PropertySource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Properties {
        self.properties.load().as_ref().clone()
    }

    fn source_type(&self) -> SourceType {
        SourceType::LocalCache
    }

    fn subscribe(&self, listener: Weak<dyn SourceListener>) {
        self.listeners.lock().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl SourceListener for Counter {
        fn on_source_change(&self, _: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_replace_notifies_live_listeners_only() {
        let source = MapSource::from_pairs("overrides", [("k", "v")]);
        let kept = Arc::new(Counter::default());
        let dropped = Arc::new(Counter::default());

        let kept_weak = Arc::downgrade(&kept);
        let dropped_weak = Arc::downgrade(&dropped);
        source.subscribe(kept_weak);
        source.subscribe(dropped_weak);
        drop(dropped);

        source.replace(Properties::new());
        assert_eq!(kept.0.load(Ordering::SeqCst), 1);
        assert_eq!(source.listeners.lock().len(), 1);
        assert!(source.properties().is_empty());
    }
}
