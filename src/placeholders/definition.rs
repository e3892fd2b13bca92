//! Placeholder definitions and type coercion.

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::manifest::PlaceholderSpec;

/// Declared type of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderType {
    Text,
    Number,
    Boolean,
    Email,
    Url,
    Password,
}

impl PlaceholderType {
    /// Parse a manifest type name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "number" | "integer" | "float" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "email" => Some(Self::Email),
            "url" => Some(Self::Url),
            "password" | "secret" => Some(Self::Password),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Email => "email",
            Self::Url => "url",
            Self::Password => "password",
        }
    }

    /// Coerce raw input into this type's canonical text form.
    ///
    /// Numbers go through a locale-independent parse and must be finite.
    /// Booleans accept only `true` or `false`, case-insensitively after
    /// trimming.
    pub fn coerce(&self, raw: &str) -> Result<String, String> {
        match self {
            Self::Text | Self::Password => Ok(raw.to_string()),
            Self::Number => {
                let trimmed = raw.trim();
                let number: f64 = trimmed
                    .parse()
                    .map_err(|_| format!("'{raw}' is not a number"))?;
                if !number.is_finite() {
                    return Err(format!("'{raw}' is not a finite number"));
                }
                Ok(number.to_string())
            }
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok("true".to_string()),
                "false" => Ok("false".to_string()),
                _ => Err(format!("'{raw}' is not true or false")),
            },
            Self::Email => {
                let trimmed = raw.trim();
                if is_email(trimmed) {
                    Ok(trimmed.to_string())
                } else {
                    Err(format!("'{raw}' is not an email address"))
                }
            }
            Self::Url => {
                let trimmed = raw.trim();
                match Url::parse(trimmed) {
                    Ok(url) if url.host_str().is_some() => Ok(trimmed.to_string()),
                    _ => Err(format!("'{raw}' is not an absolute URL")),
                }
            }
        }
    }
}

impl fmt::Display for PlaceholderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Canonical form of a placeholder token.
///
/// Surrounding `{{ }}` are dropped, the name is uppercased and every
/// character outside `[A-Z0-9_]` becomes `_`.
pub fn canonical_token(name: &str) -> String {
    let trimmed = name
        .trim()
        .trim_start_matches("{{")
        .trim_end_matches("}}")
        .trim();
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// A placeholder ready for resolution, with its default already coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderDefinition {
    pub token: String,
    pub kind: PlaceholderType,
    pub required: bool,
    pub default: Option<String>,
    pub sensitive: bool,
    pub description: Option<String>,
}

impl PlaceholderDefinition {
    /// A required text placeholder with no default.
    pub fn text(token: &str) -> Self {
        Self {
            token: canonical_token(token),
            kind: PlaceholderType::Text,
            required: true,
            default: None,
            sensitive: false,
            description: None,
        }
    }

    pub fn with_kind(mut self, kind: PlaceholderType) -> Self {
        self.kind = kind;
        self.sensitive |= kind == PlaceholderType::Password;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Normalize a manifest declaration, coercing its default once.
    pub fn from_spec(spec: &PlaceholderSpec) -> Result<Self, String> {
        let default = spec
            .default
            .as_deref()
            .map(|raw| {
                spec.kind
                    .coerce(raw)
                    .map_err(|e| format!("{}: invalid default: {e}", spec.token))
            })
            .transpose()?;
        Ok(Self {
            token: spec.token.clone(),
            kind: spec.kind,
            required: spec.required,
            default,
            sensitive: spec.sensitive || spec.kind == PlaceholderType::Password,
            description: spec.description.clone(),
        })
    }

    /// Normalize every declaration, reporting all invalid defaults together.
    pub fn from_specs(specs: &[PlaceholderSpec]) -> Result<Vec<Self>, Vec<String>> {
        let mut definitions = Vec::with_capacity(specs.len());
        let mut issues = Vec::new();
        for spec in specs {
            match Self::from_spec(spec) {
                Ok(def) => definitions.push(def),
                Err(issue) => issues.push(issue),
            }
        }
        if issues.is_empty() {
            Ok(definitions)
        } else {
            Err(issues)
        }
    }

    /// Coerce a value for this placeholder.
    pub fn coerce(&self, raw: &str) -> Result<String, String> {
        self.kind.coerce(raw)
    }
}
