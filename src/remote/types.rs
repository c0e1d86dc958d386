//! Wire types and error definitions for the config service protocol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ChangeType, ConfigSnapshot, PropertyDelta};
use crate::security::signer::SignError;

/// Sentinel notification id meaning "tell me whatever you have".
pub const INIT_NOTIFICATION_ID: i64 = -1;

/// `configSyncType` value announcing a delta-only response.
pub const INCREMENTAL_SYNC: &str = "IncrementalSync";

/// Errors that can occur while talking to the config service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure, timeout, or unexpected status. Retried with backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The server does not know the namespace (404). Not retried.
    #[error("namespace {0} not found")]
    NamespaceNotFound(String),

    /// The response did not match the protocol. Retried like a transient failure.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be signed. Retrying cannot help.
    #[error(transparent)]
    Signing(#[from] SignError),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::MalformedResponse(_))
    }
}

/// Successful outcome of a conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Snapshot(ConfigSnapshot),
    /// The release key sent is still current (304).
    NotModified,
}

/// Result type for config fetches.
pub type FetchResult = Result<FetchOutcome, FetchError>;

/// Body of `GET /configs/{appId}/{cluster}/{namespace}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApolloConfigDto {
    pub app_id: String,
    pub cluster: String,
    pub namespace_name: String,
    #[serde(default)]
    pub configurations: Option<BTreeMap<String, String>>,
    pub release_key: String,
    #[serde(default)]
    pub configuration_changes: Option<Vec<ConfigurationChangeDto>>,
    #[serde(default)]
    pub config_sync_type: Option<String>,
}

impl ApolloConfigDto {
    pub fn is_incremental(&self) -> bool {
        self.config_sync_type.as_deref() == Some(INCREMENTAL_SYNC)
    }

    /// Deltas carried by the response, in server order.
    pub fn deltas(&self, previous: &BTreeMap<String, String>) -> Vec<PropertyDelta> {
        self.configuration_changes
            .iter()
            .flatten()
            .map(|change| PropertyDelta {
                key: change.key.clone(),
                old_value: previous.get(&change.key).cloned(),
                new_value: change.new_value.clone(),
                change_type: change.configuration_change_type,
            })
            .collect()
    }
}

/// One entry of `configurationChanges`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationChangeDto {
    pub key: String,
    #[serde(default)]
    pub new_value: Option<String>,
    pub configuration_change_type: ChangeType,
}

/// Per-key notification ids the server attaches to a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessages {
    #[serde(default)]
    pub details: BTreeMap<String, i64>,
}

impl NotificationMessages {
    /// Keep the highest id seen per key.
    pub fn merge_from(&mut self, other: &NotificationMessages) {
        for (key, id) in &other.details {
            let entry = self.details.entry(key.clone()).or_insert(*id);
            if *id > *entry {
                *entry = *id;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}

/// One element of the long-poll response, and of the request's `notifications` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub namespace_name: String,
    pub notification_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<NotificationMessages>,
}
