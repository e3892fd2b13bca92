//! templet - Provision projects from template repositories.
//!
//! A provisioning run fetches a template repository into a local cache,
//! validates the caller's option selections against the template manifest,
//! resolves `{{TOKEN}}` placeholders, copies the template into the target
//! directory and finally runs the template's setup script.
//!
//! # Modules
//!
//! - [`cache`] - On-disk repository cache with TTLs and corruption recovery
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - User settings
//! - [`error`] - Error types and result aliases
//! - [`fetch`] - Repository fetchers
//! - [`locator`] - Repository locator parsing
//! - [`manifest`] - Template manifests
//! - [`options`] - Option token normalization
//! - [`pipeline`] - End-to-end provisioning
//! - [`placeholders`] - Placeholder resolution and substitution
//! - [`plan`] - Materialization plans, previews and execution
//! - [`runtime`] - Setup script loading and execution
//! - [`template`] - Template discovery
//! - [`ui`] - Terminal output and prompts
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use templet::placeholders::substitute;
//!
//! let values = BTreeMap::from([("PROJECT_NAME".to_string(), "demo".to_string())]);
//! assert_eq!(substitute("# {{PROJECT_NAME}}", &values), "# demo");
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod locator;
pub mod manifest;
pub mod options;
pub mod pipeline;
pub mod placeholders;
pub mod plan;
pub mod runtime;
pub mod template;
pub mod ui;

pub use error::{Result, TempletError};
