//! Settings discovery and loading.
//!
//! Load order (later wins):
//! 1. Built-in defaults
//! 2. User config file (`~/.templet/config.yml`, or an explicit path)
//! 3. Environment overrides (`TEMPLET_CACHE_DIR`, `TEMPLET_TTL_HOURS`)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Settings;
use crate::error::{Result, TempletError};

/// Overrides the cache root.
pub const CACHE_DIR_VAR: &str = "TEMPLET_CACHE_DIR";
/// Overrides the default TTL.
pub const TTL_HOURS_VAR: &str = "TEMPLET_TTL_HOURS";

/// The user config file at `~/.templet/config.yml`, when it exists.
pub fn user_config_path() -> Option<PathBuf> {
    let path = dirs::home_dir()?.join(".templet").join("config.yml");
    path.is_file().then_some(path)
}

/// Load settings from `path`, or the user config file when `path` is `None`.
///
/// An explicit path must exist; a missing user config is not an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_settings_with_env(path, &env)
}

/// [`load_settings`] with an explicit environment.
pub fn load_settings_with_env(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Settings> {
    let mut settings = match path.map(Path::to_path_buf).or_else(user_config_path) {
        Some(path) => parse_file(&path)?,
        None => Settings::default(),
    };
    apply_env(&mut settings, env)?;
    Ok(settings)
}

fn parse_file(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Settings::default());
    }
    tracing::debug!("Loading settings from {}", path.display());
    serde_yaml::from_str(&text).map_err(|e| TempletError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn apply_env(settings: &mut Settings, env: &HashMap<String, String>) -> Result<()> {
    if let Some(dir) = env.get(CACHE_DIR_VAR).filter(|v| !v.is_empty()) {
        settings.cache_dir = Some(PathBuf::from(dir));
    }
    if let Some(raw) = env.get(TTL_HOURS_VAR).filter(|v| !v.is_empty()) {
        let hours = raw.trim().parse::<u64>().map_err(|_| {
            TempletError::validation(format!("{TTL_HOURS_VAR} must be a whole number of hours, got '{raw}'"))
        })?;
        settings.ttl_hours = Some(hours);
    }
    Ok(())
}
