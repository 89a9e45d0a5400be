//! Configuration for the caching fetcher.
//!
//! Settings load from an optional YAML file with environment overrides
//! (`RSLNS_RIGHTS_*`), environment taking precedence, then convert into
//! the validated [`CacheConfig`] used at construction.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validated cache TTL configuration.
///
/// Successful results are served for `success_ttl`; errored results act
/// as a negative cache for `error_ttl`. Both must be non-zero: this cache
/// has no pass-through mode, deployments that want no caching use the
/// underlying fetcher directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub success_ttl: Duration,
    pub error_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            success_ttl: Duration::from_secs(5 * 60),
            error_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn with_success_ttl(mut self, ttl: Duration) -> Self {
        self.success_ttl = ttl;
        self
    }

    pub fn with_error_ttl(mut self, ttl: Duration) -> Self {
        self.error_ttl = ttl;
        self
    }

    /// Rejects zero TTLs.
    pub fn validate(&self) -> Result<(), InvalidCacheConfig> {
        if self.success_ttl.is_zero() || self.error_ttl.is_zero() {
            return Err(InvalidCacheConfig {
                success_ttl_secs: self.success_ttl.as_secs(),
                error_ttl_secs: self.error_ttl.as_secs(),
            });
        }
        Ok(())
    }
}

/// Error for zero cache TTLs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache TTLs must be non-zero (success: {success_ttl_secs}s, error: {error_ttl_secs}s)")]
pub struct InvalidCacheConfig {
    pub success_ttl_secs: u64,
    pub error_ttl_secs: u64,
}

/// Serializable cache settings, as they appear in configuration sources.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CacheSettings {
    /// TTL for successful results, in seconds.
    #[serde(default = "default_success_ttl_secs")]
    pub success_ttl_secs: u64,

    /// TTL for errored results, in seconds.
    #[serde(default = "default_error_ttl_secs")]
    pub error_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            success_ttl_secs: default_success_ttl_secs(),
            error_ttl_secs: default_error_ttl_secs(),
        }
    }
}

fn default_success_ttl_secs() -> u64 {
    5 * 60
}

fn default_error_ttl_secs() -> u64 {
    60
}

impl CacheSettings {
    /// Loads settings from `path` (if given) with `RSLNS_RIGHTS_*`
    /// environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("success_ttl_secs", default_success_ttl_secs())?
            .set_default("error_ttl_secs", default_error_ttl_secs())?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(Environment::with_prefix("RSLNS_RIGHTS"))
            .build()?
            .try_deserialize()
    }
}

impl From<CacheSettings> for CacheConfig {
    fn from(settings: CacheSettings) -> Self {
        CacheConfig {
            success_ttl: Duration::from_secs(settings.success_ttl_secs),
            error_ttl: Duration::from_secs(settings.error_ttl_secs),
        }
    }
}
