//! User configuration for templet.
//!
//! - Schema in [`settings`]
//! - File discovery and environment overrides in [`loader`]
//!
//! # Example
//!
//! ```
//! use templet::config::load_settings;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("config.yml");
//! fs::write(&path, "setup_timeout_secs: 10\n").unwrap();
//!
//! let settings = load_settings(Some(&path)).unwrap();
//! assert_eq!(settings.setup_timeout().as_secs(), 10);
//! ```

pub mod loader;
pub mod settings;

pub use loader::{
    load_settings, load_settings_with_env, user_config_path, CACHE_DIR_VAR, TTL_HOURS_VAR,
};
pub use settings::Settings;
