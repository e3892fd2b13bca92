//! Adapts raw manifest shapes into the canonical model.
//!
//! This is the only place that knows manifests come in a flat and a rich
//! form. Flat dimensions become single-select, value-restricted dimensions
//! with no default, no gates and the silent policy.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::raw::{RawDefault, RawDimension, RawManifest, RawOption, RawPlaceholders, RichDimension};
use super::{Arity, Dimension, PlaceholderSpec, TemplateManifest, UnknownPolicy, ValueRef};
use crate::placeholders::{canonical_token, PlaceholderType};

/// Convert a raw manifest into the canonical model.
pub fn adapt(raw: RawManifest) -> Result<TemplateManifest, String> {
    let mut dimensions = BTreeMap::new();
    for (name, dim) in raw.dimensions {
        let dimension = match dim {
            RawDimension::Flat(values) => flat_dimension(&name, values),
            RawDimension::Rich(rich) => rich_dimension(&name, *rich)?,
        };
        dimensions.insert(name, dimension);
    }

    let placeholders = adapt_placeholders(raw.placeholders)?;

    let unknown_dimensions = match raw.unknown_dimensions {
        Some(policy) => UnknownPolicy::parse(Some(&policy)),
        None => UnknownPolicy::Strict,
    };

    Ok(TemplateManifest {
        name: raw.name,
        description: raw.description,
        dimensions,
        placeholders,
        setup_script: raw.setup.map(PathBuf::from),
        unknown_dimensions,
    })
}

fn flat_dimension(name: &str, values: Vec<String>) -> Dimension {
    Dimension {
        name: name.to_string(),
        arity: Arity::Single,
        values,
        defaults: Vec::new(),
        required: false,
        requires: BTreeMap::new(),
        conflicts: BTreeMap::new(),
        policy: UnknownPolicy::Allow,
        catch_all: false,
    }
}

fn rich_dimension(name: &str, rich: RichDimension) -> Result<Dimension, String> {
    let arity = match (rich.arity.as_deref(), rich.multiple) {
        (Some("multi" | "multiple" | "many"), _) | (None, Some(true)) => Arity::Multi,
        (Some("single" | "one") | None, _) => Arity::Single,
        (Some(other), _) => {
            return Err(format!("dimension '{name}' has unknown arity '{other}'"));
        }
    };

    let mut values = rich.values;
    let mut requires = parse_gates(name, "requires", rich.requires)?;
    let mut conflicts = parse_gates(name, "conflicts", rich.conflicts)?;

    for option in rich.options {
        match option {
            RawOption::Bare(value) => push_unique(&mut values, value),
            RawOption::Gated(gated) => {
                for r in gated.requires {
                    requires
                        .entry(gated.value.clone())
                        .or_default()
                        .push(parse_ref(name, &r)?);
                }
                for c in gated.conflicts {
                    conflicts
                        .entry(gated.value.clone())
                        .or_default()
                        .push(parse_ref(name, &c)?);
                }
                push_unique(&mut values, gated.value);
            }
        }
    }

    let defaults = match rich.default {
        None => Vec::new(),
        Some(RawDefault::One(value)) => vec![value],
        Some(RawDefault::Many(values)) => values,
    };
    if arity == Arity::Single && defaults.len() > 1 {
        return Err(format!(
            "single-select dimension '{name}' declares {} defaults",
            defaults.len()
        ));
    }

    Ok(Dimension {
        name: name.to_string(),
        arity,
        values,
        defaults,
        required: rich.required,
        requires,
        conflicts,
        policy: UnknownPolicy::parse(rich.policy.as_deref()),
        catch_all: rich.catch_all,
    })
}

fn parse_gates(
    dimension: &str,
    kind: &str,
    gates: BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, Vec<ValueRef>>, String> {
    let mut out = BTreeMap::new();
    for (value, refs) in gates {
        let parsed = refs
            .iter()
            .map(|r| parse_ref(dimension, r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("{kind}: {e}"))?;
        out.insert(value, parsed);
    }
    Ok(out)
}

fn parse_ref(dimension: &str, input: &str) -> Result<ValueRef, String> {
    ValueRef::parse(input)
        .ok_or_else(|| format!("dimension '{dimension}' has malformed gate '{input}'"))
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn adapt_placeholders(raw: RawPlaceholders) -> Result<Vec<PlaceholderSpec>, String> {
    match raw {
        RawPlaceholders::Names(names) => Ok(names
            .iter()
            .map(|name| PlaceholderSpec {
                token: canonical_token(name),
                kind: PlaceholderType::Text,
                required: false,
                default: None,
                sensitive: false,
                description: None,
            })
            .collect()),
        RawPlaceholders::Declared(map) => map
            .into_iter()
            .map(|(name, decl)| {
                let kind = match decl.kind.as_deref() {
                    None => PlaceholderType::Text,
                    Some(k) => PlaceholderType::parse(k)
                        .ok_or_else(|| format!("placeholder '{name}' has unknown type '{k}'"))?,
                };
                let default = decl.default.as_ref().map(scalar_to_string).transpose()?;
                Ok(PlaceholderSpec {
                    token: canonical_token(&name),
                    sensitive: decl.sensitive || kind == PlaceholderType::Password,
                    kind,
                    required: decl.required,
                    default,
                    description: decl.description,
                })
            })
            .collect(),
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("placeholder default must be a scalar, got {other:?}")),
    }
}
