//! Configuration snapshots and property-level diffing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key-value properties of a namespace.
pub type Properties = BTreeMap<String, String>;

/// Kind of change a single key went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// A single-key change between two property maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDelta {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_type: ChangeType,
}

impl PropertyDelta {
    /// Apply this delta to a property map.
    pub fn apply_to(&self, properties: &mut Properties) {
        match (self.change_type, &self.new_value) {
            (ChangeType::Deleted, _) | (_, None) => {
                properties.remove(&self.key);
            }
            (_, Some(value)) => {
                properties.insert(self.key.clone(), value.clone());
            }
        }
    }
}

/// Where the data currently served for a namespace came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Remote,
    LocalCache,
    /// Neither remote nor cache answered; the namespace is empty.
    None,
}

/// An immutable view of a namespace as published by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Opaque version token. Empty for snapshots that never came from the server.
    pub release_key: String,
    pub configurations: Properties,
    /// Deltas the server reported alongside this release, if any.
    pub changes: Vec<PropertyDelta>,
}

impl ConfigSnapshot {
    pub fn new(release_key: impl Into<String>, configurations: Properties) -> Self {
        Self {
            release_key: release_key.into(),
            configurations,
            changes: Vec::new(),
        }
    }

    /// The zero-property snapshot used when neither remote nor cache is available.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Release key as an optional conditional-fetch token.
    pub fn release_key(&self) -> Option<&str> {
        if self.release_key.is_empty() {
            None
        } else {
            Some(&self.release_key)
        }
    }
}

/// Diff two property maps.
///
/// A key yields a delta iff its presence or value differs: `Added` when missing
/// from `old`, `Deleted` when missing from `new`, otherwise `Modified`.
pub fn diff_properties(old: &Properties, new: &Properties) -> Vec<PropertyDelta> {
    let mut deltas = Vec::new();

    for (key, old_value) in old {
        match new.get(key) {
            None => deltas.push(PropertyDelta {
                key: key.clone(),
                old_value: Some(old_value.clone()),
                new_value: None,
                change_type: ChangeType::Deleted,
            }),
            Some(new_value) if new_value != old_value => deltas.push(PropertyDelta {
                key: key.clone(),
                old_value: Some(old_value.clone()),
                new_value: Some(new_value.clone()),
                change_type: ChangeType::Modified,
            }),
            Some(_) => {}
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            deltas.push(PropertyDelta {
                key: key.clone(),
                old_value: None,
                new_value: Some(new_value.clone()),
                change_type: ChangeType::Added,
            });
        }
    }

    deltas.sort_by(|a, b| a.key.cmp(&b.key));
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_diff_classifies_every_key() {
        let old = props(&[("same", "1"), ("changed", "a"), ("removed", "x")]);
        let new = props(&[("same", "1"), ("changed", "b"), ("added", "y")]);

        let deltas = diff_properties(&old, &new);
        assert_eq!(deltas.len(), 3);

        let by_key: BTreeMap<_, _> = deltas.iter().map(|d| (d.key.as_str(), d)).collect();
        assert_eq!(by_key["added"].change_type, ChangeType::Added);
        assert_eq!(by_key["added"].new_value.as_deref(), Some("y"));
        assert_eq!(by_key["changed"].change_type, ChangeType::Modified);
        assert_eq!(by_key["changed"].old_value.as_deref(), Some("a"));
        assert_eq!(by_key["removed"].change_type, ChangeType::Deleted);
        assert!(by_key["removed"].new_value.is_none());
        assert!(!by_key.contains_key("same"));
    }

    #[test]
    fn test_empty_string_differs_from_absence() {
        let old = props(&[]);
        let new = props(&[("k", "")]);
        let deltas = diff_properties(&old, &new);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].change_type, ChangeType::Added);
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let a = props(&[("k1", "v1"), ("k2", "v2")]);
        assert!(diff_properties(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_apply_deltas_reproduces_target() {
        let old = props(&[("a", "1"), ("b", "2")]);
        let new = props(&[("b", "3"), ("c", "4")]);
        let mut patched = old.clone();
        for delta in diff_properties(&old, &new) {
            delta.apply_to(&mut patched);
        }
        assert_eq!(patched, new);
    }

    #[test]
    fn test_release_key_accessor() {
        assert!(ConfigSnapshot::empty().release_key().is_none());
        let snap = ConfigSnapshot::new("20240101-abc", props(&[("k", "v")]));
        assert_eq!(snap.release_key(), Some("20240101-abc"));
        assert!(!snap.is_empty());
    }
}
