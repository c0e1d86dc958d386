//! Registry construction with pluggable transport and cache.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheBackend, LocalCacheStore};
use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ValidationError};
use crate::http::{HttpClient, ReqwestHttpClient, TransportError};
use crate::registry::registry::ConfigRegistry;
use crate::view::PropertySource;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid client configuration: {}", format_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Builder for [`ConfigRegistry`].
#[derive(Debug)]
pub struct ConfigRegistryBuilder {
    config: ClientConfig,
    http: Option<Arc<dyn HttpClient>>,
    cache: Option<LocalCacheStore>,
    fallbacks: HashMap<String, Vec<Arc<dyn PropertySource>>>,
}

impl ConfigRegistryBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: None,
            cache: None,
            fallbacks: HashMap::new(),
        }
    }

    /// Transport used for every remote call. Defaults to `reqwest`.
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Cache backend. Defaults to the disk cache described by `config.cache`.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(LocalCacheStore::new(backend));
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = Some(LocalCacheStore::disabled());
        self
    }

    /// Layer `source` under the remote data of `namespace`. Sources added first win.
    pub fn fallback_source(mut self, namespace: &str, source: Arc<dyn PropertySource>) -> Self {
        let key = crate::model::Namespace::new("", "", namespace).name().to_string();
        self.fallbacks.entry(key).or_default().push(source);
        self
    }

    pub fn build(self) -> Result<ConfigRegistry, RegistryError> {
        validate_config(&self.config).map_err(RegistryError::InvalidConfig)?;

        let http = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(self.config.timeouts.connect())?),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| LocalCacheStore::from_config(&self.config.cache));

        Ok(ConfigRegistry::from_parts(self.config, http, cache, self.fallbacks))
    }
}
