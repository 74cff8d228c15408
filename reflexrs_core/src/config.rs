use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Query cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_cache_enabled() -> bool {
    true
}
const fn default_capacity() -> usize {
    1024
}
const fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Backing database and connection pool settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_url")]
    pub url: String,
    #[serde(default = "StoreConfig::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "StoreConfig::default_min_connections")]
    pub min_connections: u32,
    /// Upper bound on a single store operation, including writer-lock wait.
    /// 0 disables the deadline.
    #[serde(default = "StoreConfig::default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            min_connections: Self::default_min_connections(),
            op_timeout_ms: Self::default_op_timeout_ms(),
        }
    }
}

impl StoreConfig {
    fn default_url() -> String {
        "sqlite://reflexrs.db?mode=rwc".to_string()
    }

    const fn default_max_connections() -> u32 {
        8
    }

    const fn default_min_connections() -> u32 {
        1
    }

    const fn default_op_timeout_ms() -> u64 {
        5_000
    }

    /// Config pointing at a SQLite file, created if missing.
    #[must_use]
    pub fn sqlite_file(path: &std::path::Path) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn op_timeout(&self) -> Option<Duration> {
        if self.op_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.op_timeout_ms))
        }
    }
}
