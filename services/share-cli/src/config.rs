//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The password is loaded from DEXCOM_PASSWORD or `account.password_file`,
//! never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dexcom_auth::{Password, Region};
use serde::{Deserialize, Deserializer};
use share_transport::RetryPolicy;

use crate::error::{Error, Result};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Share account identity
#[derive(Debug, Deserialize)]
pub struct AccountConfig {
    #[serde(default, deserialize_with = "deserialize_region")]
    pub region: Region,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Path to a file containing the password (alternative to DEXCOM_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Password>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Memory,
    File,
}

/// Session lifetime and storage
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub cache: CacheKind,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout_ms: u64,
}

/// Outbound HTTP settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Replaces the region's base URL (mirrors, testing)
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Transport retry policy
#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_ttl() -> u64 {
    600
}

fn default_cache_timeout() -> u64 {
    2000
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    200
}

fn default_max_delay() -> u64 {
    4000
}

fn default_jitter() -> bool {
    true
}

fn deserialize_region<'de, D>(deserializer: D) -> std::result::Result<Region, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            cache: CacheKind::default(),
            cache_path: None,
            cache_timeout_ms: default_cache_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            base_url: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
            ..RetryPolicy::default()
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Password resolution order:
    /// 1. DEXCOM_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        match (&config.account.username, &config.account.account_id) {
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "set only one of account.username and account.account_id".into(),
                ));
            }
            (None, None) => {
                return Err(Error::Config(
                    "one of account.username or account.account_id is required".into(),
                ));
            }
            _ => {}
        }

        if config.session.ttl_secs == 0 {
            return Err(Error::Config("ttl_secs must be greater than 0".into()));
        }

        if config.session.cache == CacheKind::File && config.session.cache_path.is_none() {
            return Err(Error::Config(
                "cache = \"file\" requires session.cache_path".into(),
            ));
        }

        if config.http.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".into()));
        }

        if let Some(ref base_url) = config.http.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "base_url must start with http:// or https://, got: {base_url}"
                )));
            }
        }

        if config.retry.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }

        // Resolve password: env var takes precedence over file
        if let Ok(password) = std::env::var("DEXCOM_PASSWORD") {
            config.account.password = Some(Password::new(password));
        } else if let Some(ref password_file) = config.account.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            config.account.password = Some(Password::new(password.trim()));
        }

        if config
            .account
            .password
            .as_ref()
            .is_none_or(|password| password.is_empty())
        {
            return Err(Error::Config(
                "no password: set DEXCOM_PASSWORD or account.password_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or DEXCOM_SHARE_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("DEXCOM_SHARE_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("dexcom-share.toml")
    }
}

/// Mutex to serialize tests that read or mutate environment variables,
/// preventing data races when tests run in parallel.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
