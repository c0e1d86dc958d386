//! Change events and listener registration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::model::{Namespace, PropertyDelta};

/// Property-level changes of one namespace, keyed by property name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChangeEvent {
    pub namespace: Namespace,
    pub changes: BTreeMap<String, PropertyDelta>,
}

impl ConfigChangeEvent {
    pub fn new(namespace: Namespace, deltas: Vec<PropertyDelta>) -> Self {
        Self {
            namespace,
            changes: deltas.into_iter().map(|d| (d.key.clone(), d)).collect(),
        }
    }

    pub fn changed_keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn is_changed(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    pub fn change(&self, key: &str) -> Option<&PropertyDelta> {
        self.changes.get(key)
    }
}

/// Receives change events for a view.
pub trait ConfigChangeListener: Send + Sync {
    fn on_change(&self, event: &ConfigChangeEvent);
}

impl<F> ConfigChangeListener for F
where
    F: Fn(&ConfigChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &ConfigChangeEvent) {
        self(event)
    }
}

/// Handle returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Keys and key prefixes a listener cares about. Empty means everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interest {
    keys: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl Interest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_keys(keys)
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn matches(&self, event: &ConfigChangeEvent) -> bool {
        if self.keys.is_empty() && self.prefixes.is_empty() {
            return true;
        }
        event
            .changed_keys()
            .any(|key| self.keys.contains(key) || self.prefixes.iter().any(|p| key.starts_with(p.as_str())))
    }
}

#[derive(Clone)]
pub(crate) struct RegisteredListener {
    pub(crate) id: ListenerId,
    pub(crate) interest: Interest,
    pub(crate) listener: Arc<dyn ConfigChangeListener>,
}

impl fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("id", &self.id)
            .field("interest", &self.interest)
            .finish_non_exhaustive()
    }
}
