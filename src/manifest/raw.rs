//! Manifest shapes as template authors write them.
//!
//! Two generations of manifests exist in the wild. Older ones declare a
//! dimension as a bare list of values; newer ones use a structured form with
//! arity, defaults, gates and a policy. Both deserialize here and are turned
//! into one canonical model by [`super::adapter`].

use serde::Deserialize;
use std::collections::BTreeMap;

/// Top-level manifest document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "setup_script", alias = "setupScript")]
    pub setup: Option<String>,
    #[serde(alias = "unknownDimensions")]
    pub unknown_dimensions: Option<String>,
    pub dimensions: BTreeMap<String, RawDimension>,
    pub placeholders: RawPlaceholders,
}

/// A dimension in either manifest generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDimension {
    /// `deployment: [aws, gcp]`
    Flat(Vec<String>),
    /// Structured form.
    Rich(Box<RichDimension>),
}

/// Structured dimension declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RichDimension {
    #[serde(alias = "type", alias = "selection")]
    pub arity: Option<String>,
    pub multiple: Option<bool>,
    pub values: Vec<String>,
    pub options: Vec<RawOption>,
    pub default: Option<RawDefault>,
    pub required: bool,
    pub policy: Option<String>,
    pub requires: BTreeMap<String, Vec<String>>,
    pub conflicts: BTreeMap<String, Vec<String>>,
    #[serde(alias = "catchAll")]
    pub catch_all: bool,
}

/// A value entry in the `options:` list of a structured dimension.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawOption {
    Bare(String),
    Gated(GatedOption),
}

/// A value with its own gates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatedOption {
    pub value: String,
    pub requires: Vec<String>,
    pub conflicts: Vec<String>,
}

/// A default given as one value or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDefault {
    One(String),
    Many(Vec<String>),
}

/// Placeholder declarations in either generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPlaceholders {
    /// `placeholders: [PROJECT_NAME, AUTHOR]`
    Names(Vec<String>),
    /// Keyed structured declarations.
    Declared(BTreeMap<String, RawPlaceholder>),
}

impl Default for RawPlaceholders {
    fn default() -> Self {
        RawPlaceholders::Declared(BTreeMap::new())
    }
}

/// Structured placeholder declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPlaceholder {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub required: bool,
    pub default: Option<serde_yaml::Value>,
    pub sensitive: bool,
    pub description: Option<String>,
}
