//! Option token grammar.
//!
//! ```text
//! token  := word | dimension "=" value ("+" value)*
//! ```
//!
//! A bare word is a legacy token routed to the template's catch-all
//! dimension. `dimension=` with nothing after it is malformed.

use std::fmt;

/// One parsed option token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionToken {
    /// Legacy bare word.
    Bare(String),
    /// `dimension=value[+value...]`.
    Assign {
        dimension: String,
        values: Vec<String>,
    },
}

impl OptionToken {
    /// Parse a raw token.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let token = raw.trim();
        if token.is_empty() {
            return Err("empty option token".to_string());
        }

        let Some((dimension, rest)) = token.split_once('=') else {
            return Ok(OptionToken::Bare(token.to_string()));
        };

        let dimension = dimension.trim();
        if dimension.is_empty() {
            return Err(format!("option '{token}' names no dimension"));
        }
        if rest.trim().is_empty() {
            return Err(format!("option '{token}' has no value for dimension '{dimension}'"));
        }

        let values: Vec<String> = rest.split('+').map(|v| v.trim().to_string()).collect();
        if values.iter().any(String::is_empty) {
            return Err(format!("option '{token}' has an empty value"));
        }

        Ok(OptionToken::Assign {
            dimension: dimension.to_string(),
            values,
        })
    }
}

impl fmt::Display for OptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionToken::Bare(word) => f.write_str(word),
            OptionToken::Assign { dimension, values } => {
                write!(f, "{dimension}={}", values.join("+"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_word() {
        assert_eq!(
            OptionToken::parse(" docker ").unwrap(),
            OptionToken::Bare("docker".into())
        );
    }

    #[test]
    fn parses_plus_joined_values() {
        assert_eq!(
            OptionToken::parse("features=auth+billing").unwrap(),
            OptionToken::Assign {
                dimension: "features".into(),
                values: vec!["auth".into(), "billing".into()],
            }
        );
    }

    #[test]
    fn rejects_malformed_assignments() {
        assert!(OptionToken::parse("deployment=").is_err());
        assert!(OptionToken::parse("=aws").is_err());
        assert!(OptionToken::parse("features=a++b").is_err());
        assert!(OptionToken::parse("   ").is_err());
    }

    #[test]
    fn display_round_trips_spelling() {
        let token = OptionToken::parse("features=a+b").unwrap();
        assert_eq!(token.to_string(), "features=a+b");
    }
}
