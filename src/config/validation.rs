//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the client can locate a config service
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a `ClientConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("app_id must not be empty")]
    MissingAppId,

    #[error("cluster must not be empty")]
    MissingCluster,

    #[error("no meta server configured for env {0} and no config_service override")]
    NoMetaServer(String),

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app_id.trim().is_empty() {
        errors.push(ValidationError::MissingAppId);
    }
    if config.cluster.trim().is_empty() {
        errors.push(ValidationError::MissingCluster);
    }

    match (&config.config_service, config.meta_candidates(config.env)) {
        (Some(service), _) => check_urls(service, &mut errors),
        (None, Some(candidates)) => check_urls(candidates, &mut errors),
        (None, None) => errors.push(ValidationError::NoMetaServer(config.env.to_string())),
    }

    let positive: [(&'static str, u64); 6] = [
        ("timeouts.connect_ms", config.timeouts.connect_ms),
        ("timeouts.read_ms", config.timeouts.read_ms),
        ("timeouts.probe_ms", config.timeouts.probe_ms),
        ("timeouts.long_poll_secs", config.timeouts.long_poll_secs),
        ("retries.max_attempts", config.retries.max_attempts as u64),
        ("refresh.interval_secs", config.refresh.interval_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_urls(list: &str, errors: &mut Vec<ValidationError>) {
    for candidate in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if Url::parse(candidate).is_err() {
            errors.push(ValidationError::InvalidUrl(candidate.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Env;

    fn valid_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.app_id = "100004458".into();
        config.meta_servers.insert(Env::Dev, "http://localhost:8080".into());
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ClientConfig::default();
        config.cluster = String::new();
        config.timeouts.read_ms = 0;
        config.retries.base_delay_ms = 5000;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingAppId));
        assert!(errors.contains(&ValidationError::MissingCluster));
        assert!(errors.contains(&ValidationError::NoMetaServer("DEV".into())));
        assert!(errors.contains(&ValidationError::NotPositive { field: "timeouts.read_ms" }));
        assert!(errors.contains(&ValidationError::BackoffRange { base: 5000, max: 2000 }));
    }

    #[test]
    fn test_config_service_override_satisfies_discovery() {
        let mut config = valid_config();
        config.meta_servers.clear();
        config.config_service = Some("http://config:8080".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_candidate_url() {
        let mut config = valid_config();
        config.meta_servers.insert(Env::Dev, "http://ok:8080, not-a-url".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidUrl("not-a-url".into())]);
    }
}
