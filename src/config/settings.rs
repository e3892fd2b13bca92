//! User settings schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{default_cache_dir, DEFAULT_TTL_HOURS};
use crate::pipeline::{SetupFailurePolicy, DEFAULT_FETCH_TIMEOUT};
use crate::runtime::DEFAULT_SETUP_TIMEOUT;

/// Settings read from `~/.templet/config.yml`.
///
/// Every field is optional in the file.
///
/// # Example
///
/// ```
/// use templet::config::Settings;
///
/// let settings: Settings = serde_yaml::from_str("ttl_hours: 6\non_setup_failure: abort\n").unwrap();
/// assert_eq!(settings.ttl_hours(), 6);
/// assert_eq!(settings.fetch_timeout().as_secs(), 120);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Cache root; defaults to the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    pub ttl_hours: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub setup_timeout_secs: Option<u64>,
    pub on_setup_failure: SetupFailurePolicy,
    /// Placeholder defaults, keyed by token.
    pub placeholders: BTreeMap<String, String>,
}

impl Settings {
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours.unwrap_or(DEFAULT_TTL_HOURS)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn setup_timeout(&self) -> Duration {
        self.setup_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SETUP_TIMEOUT)
    }
}
