//! Synchronization Configuration
//!
//! Timing knobs shared by the finder and the wait engine. Values come from
//! defaults, a YAML/JSON file, and `TENAZ_*` environment overrides, in that
//! order.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::result::{TenazError, TenazResult};

/// Default wait timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default interval between condition checks in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Environment variable overriding [`SyncConfig::default_timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "TENAZ_TIMEOUT_MS";
/// Environment variable overriding [`SyncConfig::poll_interval_ms`]
pub const ENV_POLL_INTERVAL_MS: &str = "TENAZ_POLL_INTERVAL_MS";
/// Environment variable overriding [`SyncConfig::presence_probe_ms`]
pub const ENV_PRESENCE_PROBE_MS: &str = "TENAZ_PRESENCE_PROBE_MS";
/// Environment variable overriding [`SyncConfig::find_all_timeout_ms`]
pub const ENV_FIND_ALL_TIMEOUT_MS: &str = "TENAZ_FIND_ALL_TIMEOUT_MS";

/// Timing configuration for finding and waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Timeout used when a caller passes zero
    pub default_timeout_ms: u64,
    /// Sleep between condition checks
    pub poll_interval_ms: u64,
    /// Best-effort presence wait before a single-element lookup
    pub presence_probe_ms: u64,
    /// Presence wait before a multi-element lookup when the caller passes zero
    pub find_all_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            presence_probe_ms: DEFAULT_TIMEOUT_MS,
            find_all_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SyncConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Parse from YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> TenazResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()
    }

    /// Parse from JSON; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> TenazResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Load from a `.json` file, or YAML for any other extension
    pub fn from_file(path: impl AsRef<Path>) -> TenazResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Apply `TENAZ_*` overrides from the process environment
    pub fn with_env_overrides(self) -> TenazResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `TENAZ_*` overrides from an arbitrary lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> TenazResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut u64); 4] = [
            (ENV_TIMEOUT_MS, &mut self.default_timeout_ms),
            (ENV_POLL_INTERVAL_MS, &mut self.poll_interval_ms),
            (ENV_PRESENCE_PROBE_MS, &mut self.presence_probe_ms),
            (ENV_FIND_ALL_TIMEOUT_MS, &mut self.find_all_timeout_ms),
        ];
        for (key, field) in fields {
            if let Some(raw) = lookup(key) {
                *field = raw.trim().parse().map_err(|_| {
                    TenazError::config(format!("{key} must be a millisecond count, got {raw:?}"))
                })?;
            }
        }
        self.validate()
    }

    /// Reject settings the poll loop cannot run with
    pub fn validate(self) -> TenazResult<Self> {
        if self.poll_interval_ms == 0 {
            return Err(TenazError::config("poll_interval_ms must be greater than zero"));
        }
        if self.default_timeout_ms == 0 {
            return Err(TenazError::config("default_timeout_ms must be greater than zero"));
        }
        Ok(self)
    }

    /// Default timeout as a duration
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Poll interval as a duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Presence probe budget as a duration
    #[must_use]
    pub const fn presence_probe(&self) -> Duration {
        Duration::from_millis(self.presence_probe_ms)
    }

    /// Multi-element presence budget as a duration
    #[must_use]
    pub const fn find_all_timeout(&self) -> Duration {
        Duration::from_millis(self.find_all_timeout_ms)
    }

    /// A zero timeout means "use the default"
    #[must_use]
    pub const fn effective_timeout(&self, timeout: Duration) -> Duration {
        if !timeout.is_zero() {
            timeout
        } else if self.default_timeout_ms == 0 {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        } else {
            self.default_timeout()
        }
    }
}

/// Builder for `SyncConfig`
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Set the default timeout
    #[must_use]
    pub fn default_timeout_ms(mut self, ms: u64) -> Self {
        self.config.default_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the presence probe budget
    #[must_use]
    pub fn presence_probe_ms(mut self, ms: u64) -> Self {
        self.config.presence_probe_ms = ms;
        self
    }

    /// Set the multi-element presence budget
    #[must_use]
    pub fn find_all_timeout_ms(mut self, ms: u64) -> Self {
        self.config.find_all_timeout_ms = ms;
        self
    }

    /// Build the configuration, rejecting a zero poll interval or timeout
    pub fn build(self) -> TenazResult<SyncConfig> {
        self.config.validate()
    }
}
