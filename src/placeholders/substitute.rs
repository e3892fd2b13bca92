//! `{{TOKEN}}` substitution.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::definition::canonical_token;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_-]+)\s*\}\}").expect("valid placeholder regex")
});

/// Replace every `{{TOKEN}}` with its value.
///
/// Token spelling inside the braces is canonicalized, so `{{ project-name }}`
/// matches `PROJECT_NAME`. Tokens without a value are left untouched.
pub fn substitute<'t>(text: &'t str, values: &BTreeMap<String, String>) -> Cow<'t, str> {
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        match values.get(&canonical_token(&caps[1])) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("PROJECT_NAME".to_string(), "demo".to_string()),
            ("AUTHOR".to_string(), "Ada".to_string()),
        ])
    }

    #[test]
    fn replaces_known_tokens() {
        let out = substitute("# {{PROJECT_NAME}} by {{ author }}", &values());
        assert_eq!(out, "# demo by Ada");
    }

    #[test]
    fn leaves_unknown_tokens() {
        let out = substitute("{{LICENSE}} {{PROJECT_NAME}}", &values());
        assert_eq!(out, "{{LICENSE}} demo");
    }

    #[test]
    fn untouched_text_is_borrowed() {
        let out = substitute("nothing here", &values());
        assert!(matches!(out, Cow::Borrowed(_)));
    }
}
