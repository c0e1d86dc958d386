//! Config-service discovery through the meta server.
//!
//! # Responsibilities
//! - Ask the resolved meta server which config services are registered
//! - Cache the list for the meta TTL and shuffle it per call
//! - Attribute remote failures to the meta server they were discovered from

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::config::{ClientConfig, Env};
use crate::discovery::locator::{MetaServerLocator, MetaSources};
use crate::http::{urls, HttpClient, HttpRequest};
use crate::security::signer;

/// One entry of the meta server's `/services/config` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub instance_id: String,
    pub homepage_url: String,
}

/// Provides the config-service URLs fetchers and pollers talk to.
#[derive(Debug)]
pub struct ServiceLocator {
    meta: Arc<MetaServerLocator>,
    http: Arc<dyn HttpClient>,
    env: Env,
    app_id: String,
    client_ip: Option<String>,
    secret: Option<String>,
    read_timeout: Duration,
    ttl: Duration,
    config_service: ArcSwapOption<String>,
    discovered: Mutex<Option<(Vec<String>, Instant)>>,
}

impl ServiceLocator {
    pub fn new(http: Arc<dyn HttpClient>, config: &ClientConfig) -> Self {
        Self {
            meta: Arc::new(MetaServerLocator::new(http.clone(), config)),
            http,
            env: config.env,
            app_id: config.app_id.clone(),
            client_ip: config.client_ip.clone(),
            secret: config.secret.clone(),
            read_timeout: config.timeouts.read(),
            ttl: Duration::from_secs(config.meta_cache.ttl_secs),
            config_service: ArcSwapOption::new(override_of(config)),
            discovered: Mutex::new(None),
        }
    }

    pub fn meta(&self) -> &MetaServerLocator {
        &self.meta
    }

    /// Config-service base URLs in the order they should be tried.
    ///
    /// Empty only when neither an override nor any meta server is configured.
    pub async fn config_services(&self) -> Vec<String> {
        if let Some(service) = self.config_service.load_full() {
            return vec![service.as_ref().clone()];
        }

        if let Some(mut services) = self.fresh_discovery() {
            services.shuffle(&mut rand::thread_rng());
            return services;
        }

        let Some(meta) = self.meta.resolve(self.env).await else {
            tracing::error!(env = %self.env, "No meta server configured");
            return Vec::new();
        };

        // Meta and config service are commonly co-deployed. The fallback is
        // cached like a real answer so failing discovery is retried once per TTL.
        let mut services = self.discover(&meta).await.unwrap_or_else(|| vec![meta]);
        *self.discovered.lock() = Some((services.clone(), Instant::now()));
        services.shuffle(&mut rand::thread_rng());
        services
    }

    pub fn report_failure(&self) {
        if self.config_service.load().is_some() {
            return;
        }
        if self.meta.report_failure(self.env) {
            *self.discovered.lock() = None;
        }
    }

    pub fn report_success(&self) {
        self.meta.report_success(self.env);
    }

    /// Apply the hot-reloadable parts of a new client configuration.
    pub fn apply_config(&self, config: &ClientConfig) {
        self.config_service.store(override_of(config));
        let before = self.meta.cached(self.env).map(|a| a.url.clone());
        self.meta.update_sources(MetaSources::from_config(config));
        if before != self.meta.cached(self.env).map(|a| a.url.clone()) {
            *self.discovered.lock() = None;
        }
    }

    fn fresh_discovery(&self) -> Option<Vec<String>> {
        let discovered = self.discovered.lock();
        discovered
            .as_ref()
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(services, _)| services.clone())
    }

    async fn discover(&self, meta: &str) -> Option<Vec<String>> {
        let url = urls::services_url(meta, &self.app_id, self.client_ip.as_deref()).ok()?;
        let headers = match &self.secret {
            Some(secret) => match signer::build_headers(&url, &self.app_id, secret) {
                Ok(headers) => headers,
                Err(e) => {
                    tracing::warn!(meta = %meta, error = %e, "Config service discovery not signed");
                    return None;
                }
            },
            None => Vec::new(),
        };
        let request = HttpRequest::get(url, self.read_timeout).with_headers(headers);

        let response = match self.http.get(request).await {
            Ok(response) if response.is_ok() => response,
            Ok(response) => {
                tracing::warn!(meta = %meta, status = response.status, "Config service discovery failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(meta = %meta, error = %e, "Config service discovery failed");
                return None;
            }
        };

        match response.json::<Vec<ServiceDto>>() {
            Ok(services) if !services.is_empty() => Some(
                services
                    .into_iter()
                    .map(|s| s.homepage_url.trim_end_matches('/').to_string())
                    .collect(),
            ),
            Ok(_) => {
                tracing::warn!(meta = %meta, "Meta server returned no config services");
                None
            }
            Err(e) => {
                tracing::error!(meta = %meta, error = %e, "Malformed config service list");
                None
            }
        }
    }
}

fn override_of(config: &ClientConfig) -> Option<Arc<String>> {
    config
        .config_service
        .as_deref()
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(|s| Arc::new(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHttpClient, Reply};

    const SERVICES: &str = r#"[
        {"appName":"APOLLO-CONFIGSERVICE","instanceId":"i1","homepageUrl":"http://cs1:8080/"},
        {"appName":"APOLLO-CONFIGSERVICE","instanceId":"i2","homepageUrl":"http://cs2:8080/"}
    ]"#;

    fn config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.app_id = "app".into();
        config.meta_servers.insert(Env::Dev, "http://meta:8080".into());
        config
    }

    #[tokio::test]
    async fn test_discovers_and_caches_services() {
        let http = Arc::new(FakeHttpClient::new());
        http.on("http://meta:8080/services/config", Reply::ok(SERVICES));

        let locator = ServiceLocator::new(http.clone(), &config());
        let mut services = locator.config_services().await;
        services.sort();
        assert_eq!(services, vec!["http://cs1:8080".to_string(), "http://cs2:8080".to_string()]);

        locator.config_services().await;
        // one probe + one discovery; the second call is served from cache
        assert_eq!(http.count("http://meta:8080/services/config"), 2);
    }

    #[tokio::test]
    async fn test_override_bypasses_discovery() {
        let http = Arc::new(FakeHttpClient::new());
        let mut cfg = config();
        cfg.config_service = Some("http://direct:8080/".into());

        let locator = ServiceLocator::new(http.clone(), &cfg);
        assert_eq!(locator.config_services().await, vec!["http://direct:8080".to_string()]);
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_discovery_falls_back_to_meta() {
        let http = Arc::new(FakeHttpClient::new());
        http.on("http://meta:8080/services/config", Reply::ok("[]"));

        let locator = ServiceLocator::new(http, &config());
        assert_eq!(locator.config_services().await, vec!["http://meta:8080".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_discovery_fallback_is_cached() {
        let http = Arc::new(FakeHttpClient::new());
        http.on("http://meta:8080/services/config", Reply::status(500));

        let locator = ServiceLocator::new(http.clone(), &config());
        assert_eq!(locator.config_services().await, vec!["http://meta:8080".to_string()]);
        let after_first = http.count("http://meta:8080/services/config");

        for _ in 0..5 {
            assert_eq!(locator.config_services().await, vec!["http://meta:8080".to_string()]);
        }
        assert_eq!(http.count("http://meta:8080/services/config"), after_first);
    }

    #[tokio::test]
    async fn test_apply_config_switches_to_override() {
        let http = Arc::new(FakeHttpClient::new());
        http.on("http://meta:8080/services/config", Reply::ok(SERVICES));
        let locator = ServiceLocator::new(http, &config());
        locator.config_services().await;

        let mut updated = config();
        updated.config_service = Some("http://direct:8080".into());
        locator.apply_config(&updated);
        assert_eq!(locator.config_services().await, vec!["http://direct:8080".to_string()]);
    }
}
