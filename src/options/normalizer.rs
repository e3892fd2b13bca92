//! Option normalization against template dimensions.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::token::OptionToken;
use crate::error::{Result, TempletError};
use crate::manifest::{catch_all_in, Arity, Dimension, TemplateManifest, UnknownPolicy};

/// A validated selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedOptions {
    /// Selected values per dimension, in selection order.
    pub by_dimension: BTreeMap<String, Vec<String>>,
    /// Human-readable notes for values accepted under a `warn` policy.
    pub warnings: Vec<String>,
    /// Tokens rejected under a `strict` policy, as `dimension=value`.
    pub unknown: Vec<String>,
}

impl NormalizedOptions {
    /// Values selected for `dimension`.
    pub fn values(&self, dimension: &str) -> &[String] {
        self.by_dimension
            .get(dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first selected value for `dimension`.
    pub fn single(&self, dimension: &str) -> Option<&str> {
        self.values(dimension).first().map(String::as_str)
    }

    pub fn is_selected(&self, dimension: &str, value: &str) -> bool {
        self.values(dimension).iter().any(|v| v == value)
    }

    /// Fail when any token was rejected as unknown.
    pub fn reject_unknown(self) -> Result<Self> {
        if self.unknown.is_empty() {
            return Ok(self);
        }
        Err(TempletError::Validation {
            issues: self
                .unknown
                .iter()
                .map(|u| format!("unknown option '{u}'"))
                .collect(),
        })
    }
}

/// Normalizes raw option tokens against a template's dimensions.
///
/// Dimensions start from their declared defaults. Tokens then apply in
/// order: a later value for a single-select dimension replaces the earlier
/// one, while multi-select dimensions accumulate. Gates are checked once
/// every token has been applied, and every violation is reported together.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use templet::manifest::Dimension;
/// use templet::options::OptionsNormalizer;
///
/// let dims = BTreeMap::from([(
///     "deployment".to_string(),
///     Dimension::single("deployment", &["aws", "gcp"]).with_defaults(&["aws"]),
/// )]);
///
/// let normalized = OptionsNormalizer::new(&dims).normalize(&["deployment=gcp"]).unwrap();
/// assert_eq!(normalized.single("deployment"), Some("gcp"));
/// ```
#[derive(Debug, Clone)]
pub struct OptionsNormalizer<'m> {
    dimensions: &'m BTreeMap<String, Dimension>,
    unknown_dimensions: UnknownPolicy,
    catch_all: Option<&'m Dimension>,
}

impl<'m> OptionsNormalizer<'m> {
    /// Normalizer over bare dimensions; undeclared dimensions are strict.
    pub fn new(dimensions: &'m BTreeMap<String, Dimension>) -> Self {
        Self {
            dimensions,
            unknown_dimensions: UnknownPolicy::Strict,
            catch_all: catch_all_in(dimensions),
        }
    }

    /// Normalizer using a manifest's dimensions and policies.
    pub fn for_manifest(manifest: &'m TemplateManifest) -> Self {
        Self {
            unknown_dimensions: manifest.unknown_dimensions,
            ..Self::new(&manifest.dimensions)
        }
    }

    /// Policy for tokens naming undeclared dimensions.
    pub fn with_unknown_dimensions(mut self, policy: UnknownPolicy) -> Self {
        self.unknown_dimensions = policy;
        self
    }

    /// Normalize `tokens`.
    ///
    /// Malformed tokens, arity violations, missing required dimensions,
    /// conflicts and unmet requirements fail with one
    /// [`TempletError::Validation`] listing every issue. Unknown values are
    /// returned in [`NormalizedOptions::unknown`] for the caller to act on.
    pub fn normalize<S: AsRef<str>>(&self, tokens: &[S]) -> Result<NormalizedOptions> {
        let mut out = NormalizedOptions::default();
        let mut issues = Vec::new();

        for dim in self.dimensions.values() {
            if !dim.defaults.is_empty() {
                out.by_dimension
                    .insert(dim.name.clone(), dim.defaults.clone());
            }
        }

        for raw in tokens {
            match OptionToken::parse(raw.as_ref()) {
                Ok(OptionToken::Bare(word)) => self.apply_bare(&word, &mut out),
                Ok(OptionToken::Assign { dimension, values }) => {
                    if let Err(issue) = self.apply(&dimension, &values, &mut out) {
                        issues.push(issue);
                    }
                }
                Err(issue) => issues.push(issue),
            }
        }

        for dim in self.dimensions.values() {
            if dim.required && out.values(&dim.name).is_empty() {
                issues.push(format!("dimension '{}' is required", dim.name));
            }
        }

        issues.extend(self.gate_violations(&out));

        if !issues.is_empty() {
            return Err(TempletError::Validation { issues });
        }
        for warning in &out.warnings {
            tracing::warn!("{}", warning);
        }
        tracing::debug!("Normalized options: {:?}", out.by_dimension);
        Ok(out)
    }

    fn apply_bare(&self, word: &str, out: &mut NormalizedOptions) {
        match self.catch_all {
            Some(dim) => select(dim.arity, &dim.name, word, out),
            None => out.unknown.push(word.to_string()),
        }
    }

    fn apply(
        &self,
        dimension: &str,
        values: &[String],
        out: &mut NormalizedOptions,
    ) -> std::result::Result<(), String> {
        let Some(dim) = self.dimensions.get(dimension) else {
            for value in values {
                self.classify(self.unknown_dimensions, dimension, value, Arity::Multi, out, || {
                    format!("'{dimension}' is not a dimension of this template")
                });
            }
            return Ok(());
        };

        if dim.arity == Arity::Single && values.len() > 1 {
            return Err(format!(
                "dimension '{}' is single-select but got '{}'",
                dimension,
                values.join("+")
            ));
        }

        for value in values {
            if dim.accepts(value) {
                select(dim.arity, dimension, value, out);
            } else {
                self.classify(dim.policy, dimension, value, dim.arity, out, || {
                    format!(
                        "'{value}' is not a declared value of '{dimension}' (expected one of: {})",
                        dim.values.join(", ")
                    )
                });
            }
        }
        Ok(())
    }

    fn classify(
        &self,
        policy: UnknownPolicy,
        dimension: &str,
        value: &str,
        arity: Arity,
        out: &mut NormalizedOptions,
        warning: impl FnOnce() -> String,
    ) {
        match policy {
            UnknownPolicy::Strict => out.unknown.push(format!("{dimension}={value}")),
            UnknownPolicy::Warn => {
                out.warnings.push(warning());
                select(arity, dimension, value, out);
            }
            UnknownPolicy::Allow => select(arity, dimension, value, out),
        }
    }

    fn gate_violations(&self, out: &NormalizedOptions) -> Vec<String> {
        let mut conflicts = BTreeSet::new();
        let mut issues = Vec::new();

        for (name, values) in &out.by_dimension {
            let Some(dim) = self.dimensions.get(name) else {
                continue;
            };
            for value in values {
                for other in dim.conflicts.get(value).into_iter().flatten() {
                    let target = other.dimension_or(name);
                    if (target, other.value.as_str()) == (name.as_str(), value.as_str()) {
                        continue;
                    }
                    if out.is_selected(target, &other.value) {
                        let mut pair = [format!("{name}={value}"), format!("{target}={}", other.value)];
                        pair.sort();
                        conflicts.insert(pair);
                    }
                }
                for needed in dim.requires.get(value).into_iter().flatten() {
                    let target = needed.dimension_or(name);
                    if !out.is_selected(target, &needed.value) {
                        issues.push(format!(
                            "'{name}={value}' requires '{target}={}'",
                            needed.value
                        ));
                    }
                }
            }
        }

        let mut all: Vec<String> = conflicts
            .into_iter()
            .map(|[a, b]| format!("'{a}' conflicts with '{b}'"))
            .collect();
        all.extend(issues);
        all
    }
}

fn select(arity: Arity, dimension: &str, value: &str, out: &mut NormalizedOptions) {
    let slot = out.by_dimension.entry(dimension.to_string()).or_default();
    match arity {
        Arity::Single => {
            slot.clear();
            slot.push(value.to_string());
        }
        Arity::Multi => {
            if !slot.iter().any(|v| v == value) {
                slot.push(value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(list: Vec<Dimension>) -> BTreeMap<String, Dimension> {
        list.into_iter().map(|d| (d.name.clone(), d)).collect()
    }

    fn issues(err: TempletError) -> Vec<String> {
        match err {
            TempletError::Validation { issues } => issues,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_tokens_yields_defaults() {
        let d = dims(vec![
            Dimension::single("deployment", &["aws", "gcp"]).with_defaults(&["aws"]),
            Dimension::multi("features", &["auth", "billing"]).with_defaults(&["auth"]),
            Dimension::single("database", &["pg"]),
        ]);
        let out = OptionsNormalizer::new(&d).normalize::<&str>(&[]).unwrap();
        assert_eq!(out.single("deployment"), Some("aws"));
        assert_eq!(out.values("features"), ["auth"]);
        assert!(out.values("database").is_empty());
    }

    #[test]
    fn later_single_select_token_wins() {
        let d = dims(vec![Dimension::single("deployment", &["aws", "gcp"])]);
        let out = OptionsNormalizer::new(&d)
            .normalize(&["deployment=aws", "deployment=gcp"])
            .unwrap();
        assert_eq!(out.values("deployment"), ["gcp"]);
    }

    #[test]
    fn plus_join_on_single_select_is_rejected() {
        let d = dims(vec![Dimension::single("deployment", &["aws", "gcp"])]);
        let err = OptionsNormalizer::new(&d)
            .normalize(&["deployment=aws+gcp"])
            .unwrap_err();
        let issues = issues(err);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("deployment"));
    }

    #[test]
    fn multi_select_accumulates_without_duplicates() {
        let d = dims(vec![
            Dimension::multi("features", &["auth", "billing", "search"]).with_defaults(&["auth"])
        ]);
        let out = OptionsNormalizer::new(&d)
            .normalize(&["features=billing", "features=auth+search"])
            .unwrap();
        assert_eq!(out.values("features"), ["auth", "billing", "search"]);
    }

    #[test]
    fn unknown_value_follows_dimension_policy() {
        let d = dims(vec![
            Dimension::single("strict", &["a"]).with_policy(UnknownPolicy::Strict),
            Dimension::single("warned", &["a"]).with_policy(UnknownPolicy::Warn),
            Dimension::single("silent", &["a"]),
        ]);
        let out = OptionsNormalizer::new(&d)
            .normalize(&["strict=x", "warned=y", "silent=z"])
            .unwrap();

        assert_eq!(out.unknown, vec!["strict=x".to_string()]);
        assert!(out.values("strict").is_empty());
        assert_eq!(out.values("warned"), ["y"]);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.values("silent"), ["z"]);
        assert!(out.reject_unknown().is_err());
    }

    #[test]
    fn unrestricted_dimension_never_has_unknowns() {
        let d = dims(vec![Dimension::multi("tags", &[]).with_policy(UnknownPolicy::Strict)]);
        let out = OptionsNormalizer::new(&d).normalize(&["tags=anything"]).unwrap();
        assert!(out.unknown.is_empty());
        assert_eq!(out.values("tags"), ["anything"]);
    }

    #[test]
    fn undeclared_dimension_uses_manifest_policy() {
        let d = dims(vec![]);
        let strict = OptionsNormalizer::new(&d).normalize(&["cloud=aws"]).unwrap();
        assert_eq!(strict.unknown, vec!["cloud=aws".to_string()]);

        let lenient = OptionsNormalizer::new(&d)
            .with_unknown_dimensions(UnknownPolicy::Warn)
            .normalize(&["cloud=aws"])
            .unwrap();
        assert!(lenient.unknown.is_empty());
        assert_eq!(lenient.values("cloud"), ["aws"]);
        assert_eq!(lenient.warnings.len(), 1);
    }

    #[test]
    fn bare_words_go_to_catch_all() {
        let d = dims(vec![
            Dimension::single("deployment", &["aws"]),
            Dimension::multi("extras", &[]),
        ]);
        let out = OptionsNormalizer::new(&d).normalize(&["docker", "ci"]).unwrap();
        assert_eq!(out.values("extras"), ["docker", "ci"]);
    }

    #[test]
    fn bare_word_without_catch_all_is_unknown() {
        let d = dims(vec![Dimension::single("deployment", &["aws"])]);
        let out = OptionsNormalizer::new(&d).normalize(&["docker"]).unwrap();
        assert_eq!(out.unknown, vec!["docker".to_string()]);
    }

    #[test]
    fn conflicts_and_requirements_reported_together() {
        let d = dims(vec![
            Dimension::multi("features", &["ssr", "static", "auth"])
                .with_conflict("ssr", "static")
                .with_requirement("auth", "database=pg"),
            Dimension::single("database", &["pg", "none"]),
        ]);
        let err = OptionsNormalizer::new(&d)
            .normalize(&["features=ssr+static+auth", "malformed="])
            .unwrap_err();
        let issues = issues(err);
        assert_eq!(issues.len(), 3, "{issues:?}");
        assert!(issues.iter().any(|i| i.contains("conflicts")));
        assert!(issues.iter().any(|i| i.contains("requires 'database=pg'")));
    }

    #[test]
    fn cross_dimension_conflict_is_reported_once() {
        let d = dims(vec![
            Dimension::single("deployment", &["edge", "aws"]).with_conflict("edge", "database=pg"),
            Dimension::single("database", &["pg", "sqlite"]).with_conflict("pg", "deployment=edge"),
        ]);
        let err = OptionsNormalizer::new(&d)
            .normalize(&["deployment=edge", "database=pg"])
            .unwrap_err();
        assert_eq!(issues(err).len(), 1);
    }

    #[test]
    fn satisfied_requirement_passes() {
        let d = dims(vec![
            Dimension::multi("features", &["auth"]).with_requirement("auth", "database=pg"),
            Dimension::single("database", &["pg"]).with_defaults(&["pg"]),
        ]);
        assert!(OptionsNormalizer::new(&d).normalize(&["features=auth"]).is_ok());
    }

    #[test]
    fn required_dimension_must_be_set() {
        let mut database = Dimension::single("database", &["pg"]);
        database.required = true;
        let d = dims(vec![database]);
        let err = OptionsNormalizer::new(&d).normalize::<&str>(&[]).unwrap_err();
        assert!(issues(err)[0].contains("database"));
    }

    #[test]
    fn manifest_policy_is_used() {
        let manifest = TemplateManifest::from_yaml_str(
            "unknown_dimensions: warn\ndimensions:\n  deployment: [aws]\n",
        )
        .unwrap();
        let out = OptionsNormalizer::for_manifest(&manifest)
            .normalize(&["region=eu"])
            .unwrap();
        assert_eq!(out.values("region"), ["eu"]);
    }
}
