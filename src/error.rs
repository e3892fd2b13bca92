//! Error types for templet operations.
//!
//! This module defines [`TempletError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Cache staleness and corruption never surface here; the cache reports a miss
//! - Validation failures carry every offending item, never just the first
//! - Script failures always carry the original diagnostic text
//! - Use `anyhow::Error` (via `TempletError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for templet operations.
#[derive(Debug, Error)]
pub enum TempletError {
    /// Option tokens, dimension gates or placeholder values failed validation.
    #[error("Validation failed:\n  - {}", issues.join("\n  - "))]
    Validation { issues: Vec<String> },

    /// Required placeholders had no value after every source was consulted.
    #[error("Missing required placeholders: {}", tokens.join(", "))]
    MissingPlaceholders { tokens: Vec<String> },

    /// The static guard rejected a setup script before it ran.
    #[error("Sandbox violation in {}: {}", script.display(), violations.join("; "))]
    SandboxViolation {
        script: PathBuf,
        violations: Vec<String>,
    },

    /// A setup script failed to load or threw while running.
    #[error("Setup script {} failed: {message}", script.display())]
    SetupFailed { script: PathBuf, message: String },

    /// A dry run was requested for a repository that is not usable from cache.
    #[error("Preview unavailable for {locator}#{branch}: {reason}")]
    PreviewUnavailable {
        locator: String,
        branch: String,
        reason: String,
    },

    /// Fetching a repository failed.
    #[error("Failed to fetch {locator}: {message}")]
    FetchFailed { locator: String, message: String },

    /// An operation exceeded its caller-visible deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The repository locator could not be understood.
    #[error("Invalid repository locator '{input}': {message}")]
    InvalidLocator { input: String, message: String },

    /// Referenced template does not exist in the fetched repository.
    #[error("Unknown template '{name}' (available: {})", available.join(", "))]
    UnknownTemplate {
        name: String,
        available: Vec<String>,
    },

    /// A template directory carries no manifest.
    #[error("Template manifest not found in {path}")]
    ManifestNotFound { path: PathBuf },

    /// Failed to parse a template manifest.
    #[error("Failed to parse manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// Failed to parse the user configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// The target directory already holds files.
    #[error("Target directory is not empty: {path}")]
    TargetNotEmpty { path: PathBuf },

    /// A tool path resolved outside the project directory.
    #[error("Path escapes the project directory: {path}")]
    PathEscape { path: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TempletError {
    /// Build a validation error from a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        TempletError::Validation {
            issues: vec![message.into()],
        }
    }
}

/// Result type alias for templet operations.
pub type Result<T> = std::result::Result<T, TempletError>;
