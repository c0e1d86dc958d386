//! Meta-server selection with health probing.
//!
//! # Responsibilities
//! - Parse the comma-separated candidate list configured for an environment
//! - Probe candidates in order and pick the first that answers
//! - Cache the pick for a short TTL; drop it after repeated reported failures
//!
//! # Design Decisions
//! - Never fails when candidates exist: with no live candidate the first one is
//!   returned and callers tolerate the subsequent remote failure
//! - The cache lock is never held across a probe

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::{ClientConfig, Env};
use crate::discovery::address::MetaServerAddress;
use crate::http::{urls, HttpClient, HttpRequest};
use crate::security::signer;

/// Candidate lists per environment plus the global fallback list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaSources {
    per_env: HashMap<Env, Vec<String>>,
    global: Vec<String>,
}

impl MetaSources {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            per_env: config
                .meta_servers
                .iter()
                .map(|(env, list)| (*env, parse_candidates(list)))
                .filter(|(_, list)| !list.is_empty())
                .collect(),
            global: config.meta.as_deref().map(parse_candidates).unwrap_or_default(),
        }
    }

    pub fn candidates(&self, env: Env) -> &[String] {
        self.per_env.get(&env).unwrap_or(&self.global)
    }
}

/// Split a comma-separated list, trimming entries and trailing slashes.
pub fn parse_candidates(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves the meta server to use for an environment.
#[derive(Debug)]
pub struct MetaServerLocator {
    http: Arc<dyn HttpClient>,
    sources: ArcSwap<MetaSources>,
    selected: Mutex<HashMap<Env, Arc<MetaServerAddress>>>,
    app_id: String,
    client_ip: Option<String>,
    secret: Option<String>,
    probe_timeout: Duration,
    ttl: Duration,
    unhealthy_threshold: usize,
}

impl MetaServerLocator {
    pub fn new(http: Arc<dyn HttpClient>, config: &ClientConfig) -> Self {
        Self {
            http,
            sources: ArcSwap::from_pointee(MetaSources::from_config(config)),
            selected: Mutex::new(HashMap::new()),
            app_id: config.app_id.clone(),
            client_ip: config.client_ip.clone(),
            secret: config.secret.clone(),
            probe_timeout: config.timeouts.probe(),
            ttl: Duration::from_secs(config.meta_cache.ttl_secs),
            unhealthy_threshold: config.meta_cache.unhealthy_threshold as usize,
        }
    }

    /// Resolve the meta-server URL for `env`. `None` only when no candidate is configured.
    pub async fn resolve(&self, env: Env) -> Option<String> {
        if let Some(cached) = self.cached(env) {
            return Some(cached.url.clone());
        }

        let sources = self.sources.load_full();
        let candidates = sources.candidates(env);
        let first = candidates.first()?;

        for candidate in candidates {
            if self.probe(candidate).await {
                tracing::debug!(env = %env, meta = %candidate, "Meta server validated");
                self.store(env, MetaServerAddress::validated(candidate.as_str()));
                return Some(candidate.clone());
            }
        }

        tracing::warn!(
            env = %env,
            meta = %first,
            candidates = candidates.len(),
            "No meta server answered the probe, using the first candidate"
        );
        self.store(env, MetaServerAddress::unverified(first.as_str()));
        Some(first.clone())
    }

    /// Currently cached address for `env`, if still valid.
    pub fn cached(&self, env: Env) -> Option<Arc<MetaServerAddress>> {
        let selected = self.selected.lock();
        selected.get(&env).filter(|a| a.is_valid(self.ttl)).cloned()
    }

    /// Report a failed remote call through `env`'s meta server.
    ///
    /// Returns true when the cached address was invalidated by this report.
    pub fn report_failure(&self, env: Env) -> bool {
        let mut selected = self.selected.lock();
        let Some(address) = selected.get(&env) else {
            return false;
        };
        if address.mark_failure(self.unhealthy_threshold) {
            tracing::warn!(env = %env, meta = %address.url, "Meta server invalidated after repeated failures");
            selected.remove(&env);
            return true;
        }
        false
    }

    pub fn report_success(&self, env: Env) {
        if let Some(address) = self.selected.lock().get(&env) {
            address.mark_success();
        }
    }

    /// Replace candidate lists. Cached picks no longer in the new lists are dropped.
    pub fn update_sources(&self, sources: MetaSources) {
        if **self.sources.load() == sources {
            return;
        }
        let mut selected = self.selected.lock();
        selected.retain(|env, address| sources.candidates(*env).contains(&address.url));
        self.sources.store(Arc::new(sources));
        tracing::info!("Meta server candidates updated");
    }

    fn store(&self, env: Env, address: MetaServerAddress) {
        self.selected.lock().insert(env, Arc::new(address));
    }

    async fn probe(&self, candidate: &str) -> bool {
        let url = match urls::services_url(candidate, &self.app_id, self.client_ip.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(meta = %candidate, error = %e, "Skipping malformed meta server URL");
                return false;
            }
        };

        let headers = match &self.secret {
            Some(secret) => match signer::build_headers(&url, &self.app_id, secret) {
                Ok(headers) => headers,
                Err(e) => {
                    tracing::warn!(meta = %candidate, error = %e, "Meta probe not signed");
                    return false;
                }
            },
            None => Vec::new(),
        };
        let request = HttpRequest::get(url, self.probe_timeout).with_headers(headers);

        match tokio::time::timeout(self.probe_timeout, self.http.get(request)).await {
            Ok(Ok(response)) if (200..300).contains(&response.status) => true,
            Ok(Ok(response)) => {
                tracing::debug!(meta = %candidate, status = response.status, "Meta probe failed: non-success status");
                false
            }
            Ok(Err(e)) => {
                tracing::debug!(meta = %candidate, error = %e, "Meta probe failed: transport error");
                false
            }
            Err(_) => {
                tracing::debug!(meta = %candidate, "Meta probe failed: timeout");
                false
            }
        }
    }
}
