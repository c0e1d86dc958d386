//! Signed, conditional configuration fetches.
//!
//! # Responsibilities
//! - Build the config URL for a namespace with the previous release key
//! - Sign the request when an access key secret is configured
//! - Map status codes onto `FetchOutcome` / `FetchError`
//! - Rebuild full snapshots from incremental responses
//!
//! # Status Mapping
//! ```text
//! 200 → Snapshot (MalformedResponse if the body does not parse)
//! 304 → NotModified
//! 404 → NamespaceNotFound (returned at once, no other service is asked)
//! *   → Transient (next config service is tried)
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::discovery::ServiceLocator;
use crate::http::{urls, ClientIdentity, HttpClient, HttpRequest, HttpResponse};
use crate::model::{ConfigSnapshot, Namespace};
use crate::remote::types::{ApolloConfigDto, FetchError, FetchOutcome, FetchResult, NotificationMessages};
use crate::security::signer;

/// Fetches namespace snapshots from the config service.
#[derive(Debug)]
pub struct RemoteFetcher {
    http: Arc<dyn HttpClient>,
    services: Arc<ServiceLocator>,
    identity: ClientIdentity,
    secret: Option<String>,
    read_timeout: Duration,
}

impl RemoteFetcher {
    pub fn new(http: Arc<dyn HttpClient>, services: Arc<ServiceLocator>, config: &ClientConfig) -> Self {
        Self {
            http,
            services,
            identity: ClientIdentity {
                ip: config.client_ip.clone(),
                label: config.label.clone(),
                data_center: config.data_center.clone(),
            },
            secret: config.secret.clone(),
            read_timeout: config.timeouts.read(),
        }
    }

    /// Fetch `namespace`, conditional on `previous`'s release key.
    ///
    /// `messages` are the latest notification messages and are echoed to the server.
    pub async fn fetch(
        &self,
        namespace: &Namespace,
        previous: Option<&ConfigSnapshot>,
        messages: Option<&NotificationMessages>,
    ) -> FetchResult {
        let services = self.services.config_services().await;
        if services.is_empty() {
            return Err(FetchError::Transient("no config service available".to_string()));
        }

        let release_key = previous.and_then(ConfigSnapshot::release_key);
        let messages_json = match messages.filter(|m| !m.is_empty()) {
            Some(m) => Some(
                serde_json::to_string(m).map_err(|e| FetchError::MalformedResponse(e.to_string()))?,
            ),
            None => None,
        };

        let mut last_error = FetchError::Transient("no config service attempted".to_string());
        for service in &services {
            let url = match urls::config_url(service, namespace, release_key, messages_json.as_deref(), &self.identity) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(service = %service, error = %e, "Skipping malformed config service URL");
                    last_error = FetchError::Transient(format!("invalid service URL {}: {}", service, e));
                    continue;
                }
            };

            let headers = match &self.secret {
                Some(secret) => signer::build_headers(&url, namespace.app_id(), secret)?,
                None => Vec::new(),
            };
            let request = HttpRequest::get(url, self.read_timeout).with_headers(headers);

            let response = match self.http.get(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(namespace = %namespace, service = %service, error = %e, "Config fetch failed");
                    self.services.report_failure();
                    last_error = FetchError::Transient(e.to_string());
                    continue;
                }
            };

            match interpret(namespace, previous, &response) {
                Ok(outcome) => {
                    self.services.report_success();
                    return Ok(outcome);
                }
                Err(e @ FetchError::NamespaceNotFound(_)) => {
                    self.services.report_success();
                    tracing::warn!(namespace = %namespace, "Namespace not found on config service");
                    return Err(e);
                }
                Err(e @ FetchError::MalformedResponse(_)) => {
                    tracing::error!(namespace = %namespace, service = %service, error = %e, "Malformed config response");
                    last_error = e;
                }
                Err(e) => {
                    tracing::warn!(namespace = %namespace, service = %service, error = %e, "Config fetch failed");
                    self.services.report_failure();
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

fn interpret(namespace: &Namespace, previous: Option<&ConfigSnapshot>, response: &HttpResponse) -> FetchResult {
    if response.is_not_modified() {
        return Ok(FetchOutcome::NotModified);
    }
    if response.is_not_found() {
        return Err(FetchError::NamespaceNotFound(namespace.to_string()));
    }
    if !response.is_ok() {
        return Err(FetchError::Transient(format!("unexpected status {}", response.status)));
    }

    let dto: ApolloConfigDto = response
        .json()
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let previous_properties = previous.map(|p| p.configurations.clone()).unwrap_or_default();
    let changes = dto.deltas(&previous_properties);

    let configurations = if dto.is_incremental() {
        let mut merged = previous_properties;
        for change in &changes {
            change.apply_to(&mut merged);
        }
        merged
    } else {
        dto.configurations
            .ok_or_else(|| FetchError::MalformedResponse("missing configurations".to_string()))?
    };

    tracing::debug!(
        namespace = %namespace,
        release_key = %dto.release_key,
        keys = configurations.len(),
        incremental = changes.len(),
        "Fetched config snapshot"
    );

    Ok(FetchOutcome::Snapshot(ConfigSnapshot {
        release_key: dto.release_key,
        configurations,
        changes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Properties;
    use crate::security::signer::{AUTHORIZATION_HEADER, TIMESTAMP_HEADER};
    use crate::testing::{config_body, FakeHttpClient, Reply};

    const CONFIGS: &str = "http://config:8080/configs/app/default/application";

    fn client_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.app_id = "app".into();
        config.config_service = Some("http://config:8080".into());
        config
    }

    fn fetcher(http: Arc<FakeHttpClient>, config: &ClientConfig) -> RemoteFetcher {
        let services = Arc::new(ServiceLocator::new(http.clone(), config));
        RemoteFetcher::new(http, services, config)
    }

    fn ns() -> Namespace {
        Namespace::new("app", "default", "application")
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let http = Arc::new(FakeHttpClient::new());
        http.on(CONFIGS, Reply::ok(config_body("application", "rk1", &[("k1", "v1")])));

        let result = fetcher(http, &client_config()).fetch(&ns(), None, None).await.unwrap();
        match result {
            FetchOutcome::Snapshot(snapshot) => {
                assert_eq!(snapshot.release_key, "rk1");
                assert_eq!(snapshot.configurations["k1"], "v1");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_release_key_is_sent_and_304_maps_to_not_modified() {
        let http = Arc::new(FakeHttpClient::new());
        http.on(CONFIGS, Reply::status(304));

        let previous = ConfigSnapshot::new("rk1", Properties::new());
        let result = fetcher(http.clone(), &client_config())
            .fetch(&ns(), Some(&previous), None)
            .await;
        assert_eq!(result, Ok(FetchOutcome::NotModified));
        assert_eq!(http.requests()[0].url.query(), Some("releaseKey=rk1"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let http = Arc::new(FakeHttpClient::new());
        http.script(CONFIGS, vec![Reply::status(404), Reply::status(503), Reply::ok("{broken"), Reply::Fail]);
        let f = fetcher(http, &client_config());

        assert!(matches!(f.fetch(&ns(), None, None).await, Err(FetchError::NamespaceNotFound(_))));
        assert!(matches!(f.fetch(&ns(), None, None).await, Err(FetchError::Transient(_))));
        assert!(matches!(f.fetch(&ns(), None, None).await, Err(FetchError::MalformedResponse(_))));
        assert!(matches!(f.fetch(&ns(), None, None).await, Err(FetchError::Transient(_))));
    }

    #[tokio::test]
    async fn test_signed_request() {
        let http = Arc::new(FakeHttpClient::new());
        http.on(CONFIGS, Reply::ok(config_body("application", "rk1", &[])));
        let mut config = client_config();
        config.secret = Some("df23df3f59884980844ff3dada30fa97".into());

        fetcher(http.clone(), &config).fetch(&ns(), None, None).await.unwrap();

        let headers = &http.requests()[0].headers;
        assert!(headers.iter().any(|(k, v)| k == AUTHORIZATION_HEADER && v.starts_with("Apollo app:")));
        assert!(headers.iter().any(|(k, _)| k == TIMESTAMP_HEADER));
    }

    #[tokio::test]
    async fn test_incremental_response_is_applied_to_previous() {
        let http = Arc::new(FakeHttpClient::new());
        http.on(
            CONFIGS,
            Reply::ok(
                r#"{"appId":"app","cluster":"default","namespaceName":"application","releaseKey":"rk2",
                    "configSyncType":"IncrementalSync",
                    "configurationChanges":[
                        {"key":"a","newValue":"2","configurationChangeType":"MODIFIED"},
                        {"key":"b","configurationChangeType":"DELETED"},
                        {"key":"c","newValue":"3","configurationChangeType":"ADDED"}]}"#,
            ),
        );

        let previous_props: Properties = [("a", "1"), ("b", "x")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let previous = ConfigSnapshot::new("rk1", previous_props);

        let result = fetcher(http, &client_config()).fetch(&ns(), Some(&previous), None).await.unwrap();
        let FetchOutcome::Snapshot(snapshot) = result else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.configurations.len(), 2);
        assert_eq!(snapshot.configurations["a"], "2");
        assert_eq!(snapshot.configurations["c"], "3");
        assert_eq!(snapshot.changes.len(), 3);
    }

    #[tokio::test]
    async fn test_messages_are_echoed() {
        let http = Arc::new(FakeHttpClient::new());
        http.on(CONFIGS, Reply::status(304));
        let mut messages = NotificationMessages::default();
        messages.details.insert("app+default+application".into(), 7);

        fetcher(http.clone(), &client_config())
            .fetch(&ns(), None, Some(&messages))
            .await
            .unwrap();

        let url = &http.requests()[0].url;
        let (_, value) = url.query_pairs().find(|(k, _)| k == "messages").unwrap();
        assert_eq!(value, r#"{"details":{"app+default+application":7}}"#);
    }
}
