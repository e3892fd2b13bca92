//! Placeholder resolution.

use std::collections::BTreeMap;

use super::definition::PlaceholderDefinition;
use super::report::ResolutionReport;
use super::sources::{PlaceholderSources, ValueSource};
use crate::error::{Result, TempletError};

/// Outcome of a successful resolution.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Final value per canonical token.
    pub values: BTreeMap<String, String>,
    /// Redacted audit trail in declaration order.
    pub report: ResolutionReport,
    /// Flag or config tokens the template does not declare.
    pub unknown_tokens: Vec<String>,
}

impl Resolution {
    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }
}

/// Resolves placeholder values from ranked sources.
///
/// Precedence, highest first: flag, prompt, environment, config, default.
/// A prompt is shown only when no flag supplied the token, pre-filled with
/// whatever lower-precedence source would otherwise win.
///
/// # Example
///
/// ```
/// use templet::placeholders::{PlaceholderDefinition, PlaceholderResolver, PlaceholderSources, ValueSource};
///
/// let defs = vec![PlaceholderDefinition::text("PROJECT_NAME")];
/// let mut sources = PlaceholderSources::new()
///     .flag("PROJECT_NAME", "demo")
///     .with_config([("PROJECT_NAME", "from-config")]);
///
/// let resolution = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
/// assert_eq!(resolution.get("PROJECT_NAME"), Some("demo"));
/// assert_eq!(resolution.report.source_of("PROJECT_NAME"), Some(ValueSource::Flag));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver;

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve every definition.
    ///
    /// Invalid values and unset required tokens are collected across all
    /// definitions and reported in one error.
    pub fn resolve(
        &self,
        definitions: &[PlaceholderDefinition],
        sources: &mut PlaceholderSources<'_>,
    ) -> Result<Resolution> {
        let mut resolution = Resolution {
            unknown_tokens: unknown_tokens(definitions, sources),
            ..Default::default()
        };
        let mut issues = Vec::new();
        let mut missing = Vec::new();

        for def in definitions {
            let Some((raw, source)) = pick(def, sources)? else {
                if def.required {
                    missing.push(def.token.clone());
                }
                continue;
            };

            match def.coerce(&raw) {
                Ok(value) => {
                    resolution
                        .report
                        .record(&def.token, &value, source, def.sensitive);
                    resolution.values.insert(def.token.clone(), value);
                }
                Err(reason) => {
                    let shown = if def.sensitive { "invalid value" } else { reason.as_str() };
                    issues.push(format!("{} ({} from {}): {}", def.token, def.kind, source, shown));
                }
            }
        }

        if !issues.is_empty() {
            issues.extend(
                missing
                    .iter()
                    .map(|token| format!("{token}: required placeholder has no value")),
            );
            return Err(TempletError::Validation { issues });
        }
        if !missing.is_empty() {
            return Err(TempletError::MissingPlaceholders { tokens: missing });
        }

        for token in &resolution.unknown_tokens {
            tracing::warn!("Ignoring undeclared placeholder {}", token);
        }
        tracing::debug!("Resolved placeholders:\n{}", resolution.report);
        Ok(resolution)
    }
}

fn pick(
    def: &PlaceholderDefinition,
    sources: &mut PlaceholderSources<'_>,
) -> Result<Option<(String, ValueSource)>> {
    if let Some(value) = sources.flags.get(&def.token) {
        return Ok(Some((value.clone(), ValueSource::Flag)));
    }

    let fallback = sources
        .environment
        .get(&def.token)
        .map(|v| (v.clone(), ValueSource::Environment))
        .or_else(|| {
            sources
                .config
                .get(&def.token)
                .map(|v| (v.clone(), ValueSource::Config))
        })
        .or_else(|| {
            def.default
                .as_ref()
                .map(|v| (v.clone(), ValueSource::Default))
        });

    if let Some(prompter) = sources.prompter.as_mut() {
        let suggested = fallback.as_ref().map(|(v, _)| v.as_str());
        if let Some(answer) = prompter.ask(def, suggested)? {
            if !answer.is_empty() {
                return Ok(Some((answer, ValueSource::Prompt)));
            }
        }
    }

    Ok(fallback)
}

fn unknown_tokens(definitions: &[PlaceholderDefinition], sources: &PlaceholderSources<'_>) -> Vec<String> {
    let mut unknown: Vec<String> = sources
        .flags
        .keys()
        .chain(sources.config.keys())
        .filter(|token| !definitions.iter().any(|d| &d.token == *token))
        .cloned()
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholders::{PlaceholderType, ScriptedPrompter};

    #[test]
    fn flag_beats_every_other_source() {
        let defs = vec![PlaceholderDefinition::text("AUTHOR").with_default("manifest")];
        let mut prompter = ScriptedPrompter::new().answer("AUTHOR", "prompted");
        let mut sources = PlaceholderSources::new()
            .flag("AUTHOR", "flagged")
            .with_env_vars([("TEMPLET_AUTHOR", "env")])
            .with_config([("AUTHOR", "config")])
            .with_prompter(&mut prompter);

        let res = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
        assert_eq!(res.get("AUTHOR"), Some("flagged"));
        assert_eq!(res.report.source_of("AUTHOR"), Some(ValueSource::Flag));
        drop(sources);
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn each_lower_source_applies_in_turn() {
        let defs = vec![
            PlaceholderDefinition::text("A").with_default("d"),
            PlaceholderDefinition::text("B").with_default("d"),
            PlaceholderDefinition::text("C").with_default("d"),
        ];
        let mut sources = PlaceholderSources::new()
            .with_env_vars([("TEMPLET_A", "env")])
            .with_config([("A", "config"), ("B", "config")]);

        let res = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
        assert_eq!(res.report.source_of("A"), Some(ValueSource::Environment));
        assert_eq!(res.report.source_of("B"), Some(ValueSource::Config));
        assert_eq!(res.report.source_of("C"), Some(ValueSource::Default));
    }

    #[test]
    fn prompt_outranks_environment_and_sees_fallback() {
        struct Echo(Vec<Option<String>>);
        impl crate::placeholders::Prompter for Echo {
            fn ask(
                &mut self,
                _: &PlaceholderDefinition,
                suggested: Option<&str>,
            ) -> Result<Option<String>> {
                self.0.push(suggested.map(str::to_string));
                Ok(Some("typed".into()))
            }
        }

        let defs = vec![PlaceholderDefinition::text("AUTHOR")];
        let mut echo = Echo(Vec::new());
        let mut sources = PlaceholderSources::new()
            .with_env_vars([("TEMPLET_AUTHOR", "env")])
            .with_prompter(&mut echo);

        let res = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
        assert_eq!(res.get("AUTHOR"), Some("typed"));
        assert_eq!(res.report.source_of("AUTHOR"), Some(ValueSource::Prompt));
        drop(sources);
        assert_eq!(echo.0, vec![Some("env".to_string())]);
    }

    #[test]
    fn empty_prompt_answer_falls_through() {
        let defs = vec![PlaceholderDefinition::text("AUTHOR").with_default("nobody")];
        let mut prompter = ScriptedPrompter::new().answer("AUTHOR", "");
        let mut sources = PlaceholderSources::new().with_prompter(&mut prompter);

        let res = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
        assert_eq!(res.report.source_of("AUTHOR"), Some(ValueSource::Default));
    }

    #[test]
    fn all_missing_required_reported_together() {
        let defs = vec![
            PlaceholderDefinition::text("AUTHOR"),
            PlaceholderDefinition::text("LICENSE"),
            PlaceholderDefinition::text("OPTIONAL").optional(),
        ];
        let err = PlaceholderResolver::new()
            .resolve(&defs, &mut PlaceholderSources::new())
            .unwrap_err();
        match err {
            TempletError::MissingPlaceholders { tokens } => {
                assert_eq!(tokens, vec!["AUTHOR".to_string(), "LICENSE".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_values_aggregate_and_redact() {
        let defs = vec![
            PlaceholderDefinition::text("PORT").with_kind(PlaceholderType::Number),
            PlaceholderDefinition::text("DEBUG").with_kind(PlaceholderType::Boolean),
            PlaceholderDefinition::text("PIN")
                .with_kind(PlaceholderType::Number)
                .sensitive(),
        ];
        let mut sources = PlaceholderSources::new()
            .flag("PORT", "eighty")
            .flag("DEBUG", "1")
            .flag("PIN", "secret-pin");

        let err = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap_err();
        match err {
            TempletError::Validation { issues } => {
                assert_eq!(issues.len(), 3);
                assert!(issues.iter().all(|i| !i.contains("secret-pin")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn undeclared_flag_and_config_tokens_are_retained() {
        let defs = vec![PlaceholderDefinition::text("AUTHOR").optional()];
        let mut sources = PlaceholderSources::new()
            .flag("AUTHR", "typo")
            .with_config([("EXTRA", "x")])
            .with_env_vars([("TEMPLET_CACHE_DIR", "/tmp")]);

        let res = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
        assert_eq!(res.unknown_tokens, vec!["AUTHR".to_string(), "EXTRA".to_string()]);
        assert!(res.values.is_empty());
    }

    #[test]
    fn sensitive_value_resolved_but_redacted_in_report() {
        let defs = vec![PlaceholderDefinition::text("DB_PASSWORD").with_kind(PlaceholderType::Password)];
        let mut sources = PlaceholderSources::new().flag("DB_PASSWORD", "hunter2");

        let res = PlaceholderResolver::new().resolve(&defs, &mut sources).unwrap();
        assert_eq!(res.get("DB_PASSWORD"), Some("hunter2"));
        assert!(!res.report.to_string().contains("hunter2"));
        assert_eq!(res.report.source_of("DB_PASSWORD"), Some(ValueSource::Flag));
    }
}
