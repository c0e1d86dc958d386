//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Deployment environment a meta-server list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Env {
    Local,
    Dev,
    Fws,
    Fat,
    Uat,
    Lpt,
    Pro,
    Tools,
    Unknown,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Local => "LOCAL",
            Env::Dev => "DEV",
            Env::Fws => "FWS",
            Env::Fat => "FAT",
            Env::Uat => "UAT",
            Env::Lpt => "LPT",
            Env::Pro => "PRO",
            Env::Tools => "TOOLS",
            Env::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Env {
    type Err = String;

    /// Case-insensitive, with the common aliases (`PROD`, `FAT`/`FWS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(Env::Local),
            "DEV" => Ok(Env::Dev),
            "FWS" => Ok(Env::Fws),
            "FAT" => Ok(Env::Fat),
            "UAT" => Ok(Env::Uat),
            "LPT" => Ok(Env::Lpt),
            "PRO" | "PROD" => Ok(Env::Pro),
            "TOOLS" => Ok(Env::Tools),
            "UNKNOWN" | "" => Ok(Env::Unknown),
            other => Err(format!("unknown env '{}'", other)),
        }
    }
}

impl TryFrom<String> for Env {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Env> for String {
    fn from(env: Env) -> Self {
        env.as_str().to_string()
    }
}

/// Root configuration for the client.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Application identifier.
    pub app_id: String,

    /// Cluster name ("default" unless overridden).
    pub cluster: String,

    /// Environment whose meta servers are used.
    pub env: Env,

    /// Data center, sent to the server for cluster fallback.
    pub data_center: Option<String>,

    /// Grayscale label.
    pub label: Option<String>,

    /// Client IP reported to the server.
    pub client_ip: Option<String>,

    /// Access key secret. When set, every request is signed.
    pub secret: Option<String>,

    /// Comma-separated meta-server candidates per environment.
    pub meta_servers: HashMap<Env, String>,

    /// Global meta-server list, used when the env has no entry.
    pub meta: Option<String>,

    /// Config service override. Skips meta-server discovery entirely.
    pub config_service: Option<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for config fetches.
    pub retries: RetryConfig,

    /// Long-poll failure backoff.
    pub long_poll: LongPollConfig,

    /// Periodic refresh settings.
    pub refresh: RefreshConfig,

    /// Meta-server address cache settings.
    pub meta_cache: MetaCacheConfig,

    /// Local cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("app_id", &self.app_id)
            .field("cluster", &self.cluster)
            .field("env", &self.env)
            .field("data_center", &self.data_center)
            .field("label", &self.label)
            .field("client_ip", &self.client_ip)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("meta_servers", &self.meta_servers)
            .field("meta", &self.meta)
            .field("config_service", &self.config_service)
            .field("timeouts", &self.timeouts)
            .field("retries", &self.retries)
            .field("long_poll", &self.long_poll)
            .field("refresh", &self.refresh)
            .field("meta_cache", &self.meta_cache)
            .field("cache", &self.cache)
            .field("observability", &self.observability)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            cluster: "default".to_string(),
            env: Env::Dev,
            data_center: None,
            label: None,
            client_ip: None,
            secret: None,
            meta_servers: HashMap::new(),
            meta: None,
            config_service: None,
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            long_poll: LongPollConfig::default(),
            refresh: RefreshConfig::default(),
            meta_cache: MetaCacheConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Candidate meta-server list for an environment, falling back to `meta`.
    pub fn meta_candidates(&self, env: Env) -> Option<&str> {
        self.meta_servers
            .get(&env)
            .map(String::as_str)
            .or(self.meta.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Timeout configuration for remote calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Config fetch / discovery read timeout in milliseconds.
    pub read_ms: u64,

    /// Meta-server health probe timeout in milliseconds.
    pub probe_ms: u64,

    /// Long-poll read timeout in seconds. Must exceed the server hold time.
    pub long_poll_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 1000,
            read_ms: 5000,
            probe_ms: 1000,
            long_poll_secs: 90,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn long_poll(&self) -> Duration {
        Duration::from_secs(self.long_poll_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of fetch attempts before falling back to the cache.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Long-poll failure backoff.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LongPollConfig {
    /// First delay after a failed poll, in seconds.
    pub failure_base_secs: u64,

    /// Upper bound for the failure delay, in seconds.
    pub failure_max_secs: u64,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            failure_base_secs: 1,
            failure_max_secs: 120,
        }
    }
}

/// Periodic refresh settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Refresh every namespace on this interval regardless of notifications.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

/// Meta-server address cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetaCacheConfig {
    /// How long a validated address is reused without re-probing.
    pub ttl_secs: u64,

    /// Consecutive remote failures that invalidate a cached address.
    pub unhealthy_threshold: u32,
}

impl Default for MetaCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            unhealthy_threshold: 3,
        }
    }
}

/// Local cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the disk cache.
    pub enabled: bool,

    /// Root directory for cache files.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\opt\\data")
    } else {
        PathBuf::from("/opt/data")
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
