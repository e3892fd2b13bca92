//! Ranked sources of placeholder values.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::definition::{canonical_token, PlaceholderDefinition};
use crate::error::Result;

/// Prefix of environment variables that override placeholders.
pub const ENV_PREFIX: &str = "TEMPLET_";

/// Where a resolved value came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Flag,
    Prompt,
    Environment,
    Config,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueSource::Flag => "flag",
            ValueSource::Prompt => "prompt",
            ValueSource::Environment => "environment",
            ValueSource::Config => "config",
            ValueSource::Default => "default",
        })
    }
}

/// Asks a person for placeholder values.
pub trait Prompter {
    /// Ask for `definition`, offering `suggested` as the pre-filled answer.
    ///
    /// `None` means no answer; lower-precedence sources then apply.
    fn ask(
        &mut self,
        definition: &PlaceholderDefinition,
        suggested: Option<&str>,
    ) -> Result<Option<String>>;
}

/// Prompter that answers from a fixed table. Useful in tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: HashMap<String, String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `token` with `value`.
    pub fn answer(mut self, token: &str, value: &str) -> Self {
        self.answers.insert(canonical_token(token), value.to_string());
        self
    }

    /// Tokens asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(
        &mut self,
        definition: &PlaceholderDefinition,
        _suggested: Option<&str>,
    ) -> Result<Option<String>> {
        self.asked.push(definition.token.clone());
        Ok(self.answers.get(&definition.token).cloned())
    }
}

/// Every input the resolver may draw on.
///
/// Keys are canonicalized on insertion, so `project-name` and
/// `PROJECT_NAME` address the same placeholder.
#[derive(Default)]
pub struct PlaceholderSources<'a> {
    pub(crate) flags: BTreeMap<String, String>,
    pub(crate) environment: BTreeMap<String, String>,
    pub(crate) config: BTreeMap<String, String>,
    pub(crate) prompter: Option<&'a mut dyn Prompter>,
}

impl<'a> PlaceholderSources<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one flag value.
    pub fn flag(mut self, token: &str, value: &str) -> Self {
        self.flags.insert(canonical_token(token), value.to_string());
        self
    }

    /// Add flag values.
    pub fn with_flags<K, V>(mut self, flags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in flags {
            self.flags.insert(canonical_token(k.as_ref()), v.into());
        }
        self
    }

    /// Read overrides from `TEMPLET_<TOKEN>` variables.
    pub fn with_env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in vars {
            if let Some(token) = k.as_ref().strip_prefix(ENV_PREFIX) {
                if !token.is_empty() {
                    self.environment.insert(canonical_token(token), v.into());
                }
            }
        }
        self
    }

    /// Read overrides from the process environment.
    pub fn with_process_env(self) -> Self {
        self.with_env_vars(std::env::vars())
    }

    /// Add configuration-file defaults.
    pub fn with_config<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in values {
            self.config.insert(canonical_token(k.as_ref()), v.into());
        }
        self
    }

    /// Enable interactive prompting.
    pub fn with_prompter(mut self, prompter: &'a mut dyn Prompter) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Whether a prompter is attached.
    pub fn is_interactive(&self) -> bool {
        self.prompter.is_some()
    }
}
