//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{ClientConfig, Env};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

const APP_ID: &str = "APP_ID";
const META: &str = "APOLLO_META";
const CLUSTER: &str = "APOLLO_CLUSTER";
const IDC: &str = "IDC";
const ENV_NAMES: [&str; 2] = ["APOLLO_ENV", "ENV"];
const CACHE_DIR: &str = "APOLLO_CACHE_DIR";
const SECRET: &str = "APOLLO_ACCESS_KEY_SECRET";
const LABEL: &str = "APOLLO_LABEL";
const CONFIG_SERVICE: &str = "APOLLO_CONFIG_SERVICE";

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    load_config_str(&content, |name| std::env::var(name).ok())
}

/// Build configuration from defaults plus environment variables only.
pub fn load_from_env() -> Result<ClientConfig, ConfigError> {
    load_config_str("", |name| std::env::var(name).ok())
}

/// Parse, override and validate. `lookup` resolves environment variables.
pub fn load_config_str<F>(content: &str, lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: ClientConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables on a parsed configuration.
///
/// Empty values are ignored. Unparseable env names are logged and ignored.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(app_id) = get(APP_ID) {
        config.app_id = app_id;
    }
    if let Some(cluster) = get(CLUSTER) {
        config.cluster = cluster;
    }
    if let Some(idc) = get(IDC) {
        config.data_center = Some(idc);
    }
    if let Some(raw) = ENV_NAMES.iter().find_map(|name| get(name)) {
        match raw.parse::<Env>() {
            Ok(env) => config.env = env,
            Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid env override"),
        }
    }
    if let Some(meta) = get(META) {
        config.meta = Some(meta);
    }
    for env in [
        Env::Local,
        Env::Dev,
        Env::Fws,
        Env::Fat,
        Env::Uat,
        Env::Lpt,
        Env::Pro,
        Env::Tools,
    ] {
        let prefixed = format!("APOLLO_{}_META", env.as_str());
        let bare = format!("{}_META", env.as_str());
        if let Some(meta) = get(&prefixed).or_else(|| get(&bare)) {
            config.meta_servers.insert(env, meta);
        }
    }
    if let Some(dir) = get(CACHE_DIR) {
        config.cache.dir = PathBuf::from(dir);
    }
    if let Some(secret) = get(SECRET) {
        config.secret = Some(secret);
    }
    if let Some(label) = get(LABEL) {
        config.label = Some(label);
    }
    if let Some(service) = get(CONFIG_SERVICE) {
        config.config_service = Some(service);
    }
}
