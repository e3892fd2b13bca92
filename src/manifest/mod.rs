//! Template manifests.
//!
//! A manifest declares a template's configuration dimensions, its
//! placeholders and an optional setup script. Manifests are trusted to have
//! passed schema validation already; this module only adapts their two
//! historical shapes into the canonical model the rest of the pipeline uses.
//!
//! # Example
//!
//! ```
//! use templet::manifest::{Arity, TemplateManifest};
//!
//! let manifest = TemplateManifest::from_yaml_str(
//!     r#"
//! name: starter
//! dimensions:
//!   deployment: [aws, gcp]
//! placeholders:
//!   PROJECT_NAME: { type: text, required: true }
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(manifest.dimensions["deployment"].arity, Arity::Single);
//! assert_eq!(manifest.placeholders[0].token, "PROJECT_NAME");
//! ```

pub mod adapter;
pub mod raw;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, TempletError};
use crate::placeholders::PlaceholderType;

/// Selection arity of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Single,
    Multi,
}

/// How values outside a dimension's declared set are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownPolicy {
    /// Reported in `unknown`; callers treat it as an error.
    Strict,
    /// Kept, with a warning.
    Warn,
    /// Kept silently.
    #[default]
    Allow,
}

impl UnknownPolicy {
    /// Parse a policy name; anything unrecognized means [`UnknownPolicy::Allow`].
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("strict") => UnknownPolicy::Strict,
            Some("warn") => UnknownPolicy::Warn,
            _ => UnknownPolicy::Allow,
        }
    }
}

/// Reference to a dimension value inside a gate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValueRef {
    /// Dimension the value belongs to; `None` means the declaring dimension.
    pub dimension: Option<String>,
    pub value: String,
}

impl ValueRef {
    /// Parse `dimension=value` or a bare `value`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        match input.split_once('=') {
            Some((dim, value)) if !dim.trim().is_empty() && !value.trim().is_empty() => {
                Some(Self {
                    dimension: Some(dim.trim().to_string()),
                    value: value.trim().to_string(),
                })
            }
            Some(_) => None,
            None if !input.is_empty() => Some(Self {
                dimension: None,
                value: input.to_string(),
            }),
            None => None,
        }
    }

    /// Dimension this reference points into, given the declaring dimension.
    pub fn dimension_or<'a>(&'a self, owner: &'a str) -> &'a str {
        self.dimension.as_deref().unwrap_or(owner)
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dimension {
            Some(dim) => write!(f, "{dim}={}", self.value),
            None => f.write_str(&self.value),
        }
    }
}

/// A configuration axis exposed by a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub arity: Arity,
    /// Allowed values; empty means unrestricted.
    pub values: Vec<String>,
    pub defaults: Vec<String>,
    pub required: bool,
    /// value -> values that must also be selected.
    pub requires: BTreeMap<String, Vec<ValueRef>>,
    /// value -> values that must not be selected alongside it.
    pub conflicts: BTreeMap<String, Vec<ValueRef>>,
    pub policy: UnknownPolicy,
    /// Receives bare legacy tokens.
    pub catch_all: bool,
}

impl Dimension {
    /// A single-select dimension restricted to `values`.
    pub fn single(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            arity: Arity::Single,
            values: values.iter().map(|v| v.to_string()).collect(),
            defaults: Vec::new(),
            required: false,
            requires: BTreeMap::new(),
            conflicts: BTreeMap::new(),
            policy: UnknownPolicy::Allow,
            catch_all: false,
        }
    }

    /// A multi-select dimension restricted to `values`.
    pub fn multi(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            arity: Arity::Multi,
            ..Self::single(name, values)
        }
    }

    /// Set default values.
    pub fn with_defaults(mut self, defaults: &[&str]) -> Self {
        self.defaults = defaults.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Set the unknown-value policy.
    pub fn with_policy(mut self, policy: UnknownPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Declare that `value` conflicts with `other` (`dim=value` or bare).
    pub fn with_conflict(mut self, value: &str, other: &str) -> Self {
        if let Some(r) = ValueRef::parse(other) {
            self.conflicts.entry(value.to_string()).or_default().push(r);
        }
        self
    }

    /// Declare that `value` requires `other` (`dim=value` or bare).
    pub fn with_requirement(mut self, value: &str, other: &str) -> Self {
        if let Some(r) = ValueRef::parse(other) {
            self.requires.entry(value.to_string()).or_default().push(r);
        }
        self
    }

    /// Whether any value is accepted.
    pub fn is_unrestricted(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `value` is in the declared set.
    pub fn accepts(&self, value: &str) -> bool {
        self.is_unrestricted() || self.values.iter().any(|v| v == value)
    }
}

/// A placeholder as declared by the manifest, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderSpec {
    /// Canonical uppercase token.
    pub token: String,
    pub kind: PlaceholderType,
    pub required: bool,
    /// Declared default in textual form.
    pub default: Option<String>,
    pub sensitive: bool,
    pub description: Option<String>,
}

/// The canonical manifest model.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub dimensions: BTreeMap<String, Dimension>,
    pub placeholders: Vec<PlaceholderSpec>,
    /// Setup script path, relative to the template directory.
    pub setup_script: Option<PathBuf>,
    /// Policy for tokens naming undeclared dimensions.
    pub unknown_dimensions: UnknownPolicy,
}

impl TemplateManifest {
    /// Parse a manifest from YAML (or JSON) text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let raw: raw::RawManifest =
            serde_yaml::from_str(text).map_err(|e| TempletError::ManifestParse {
                path: PathBuf::from("<inline>"),
                message: e.to_string(),
            })?;
        adapter::adapt(raw).map_err(|message| TempletError::ManifestParse {
            path: PathBuf::from("<inline>"),
            message,
        })
    }

    /// Load a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            TempletError::ManifestParse { message, .. } => TempletError::ManifestParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// The dimension that receives bare legacy tokens, if any.
    ///
    /// An explicit `catch_all` marker wins; otherwise the sole multi-select
    /// dimension with an unrestricted value set qualifies.
    pub fn catch_all_dimension(&self) -> Option<&Dimension> {
        catch_all_in(&self.dimensions)
    }
}

/// The dimension in `dimensions` that receives bare legacy tokens.
pub fn catch_all_in(dimensions: &BTreeMap<String, Dimension>) -> Option<&Dimension> {
    if let Some(dim) = dimensions.values().find(|d| d.catch_all) {
        return Some(dim);
    }
    let mut open = dimensions
        .values()
        .filter(|d| d.arity == Arity::Multi && d.is_unrestricted());
    match (open.next(), open.next()) {
        (Some(dim), None) => Some(dim),
        _ => None,
    }
}
