//! Customization runtime for template setup scripts.
//!
//! A template may ship a setup script that tailors the new project after
//! its files are copied. The script receives one object holding a frozen
//! `context` and a capability-scoped `tools` surface:
//!
//! ```text
//! export default async function ({ context, tools }) {
//!   if (context.options.deployment === "aws") {
//!     await tools.files.append("README.md", "Deploys to AWS.");
//!   }
//!   await tools.placeholders.replaceAll(["package.json"]);
//! }
//! ```
//!
//! Loading runs the static [`guard`] first, then parses the module; a
//! positional `(context, tools)` entry point fails to load. Execution is a
//! single attempt. Every failure is reported with its original diagnostic.

pub mod edit;
pub mod guard;
pub mod ide;
pub mod interpreter;
pub mod json_edit;
pub mod lexer;
pub mod parser;
pub mod tools;

pub use edit::TextEdit;
pub use interpreter::{Interpreter, Value};
pub use json_edit::JsonEdit;
pub use parser::{parse_module, Module, EXPECTED_SIGNATURE};
pub use tools::{confine, ProjectTools, RecordingTools, ToolCall, ToolSurface};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Result, TempletError};
use crate::manifest::{Arity, Dimension};
use crate::options::NormalizedOptions;

/// Default execution deadline for a setup script.
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(30);

/// A chosen dimension value as scripts see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    One(String),
    Many(Vec<String>),
}

/// Immutable description of the project a script customizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectContext {
    pub name: String,
    /// Absolute project directory.
    pub directory: PathBuf,
    pub options: BTreeMap<String, OptionValue>,
    pub ide: Option<String>,
}

impl ProjectContext {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            options: BTreeMap::new(),
            ide: None,
        }
    }

    /// Set the chosen IDE preset.
    pub fn with_ide(mut self, ide: Option<String>) -> Self {
        self.ide = ide;
        self
    }

    /// Expose a normalized selection.
    ///
    /// Single-select dimensions become strings and multi-select dimensions
    /// become arrays; declared multi-select dimensions with nothing chosen
    /// appear as empty arrays.
    pub fn with_options(
        mut self,
        selection: &NormalizedOptions,
        dimensions: &BTreeMap<String, Dimension>,
    ) -> Self {
        for dim in dimensions.values().filter(|d| d.arity == Arity::Multi) {
            self.options
                .insert(dim.name.clone(), OptionValue::Many(Vec::new()));
        }
        for (name, values) in &selection.by_dimension {
            let multi = match dimensions.get(name) {
                Some(dim) => dim.arity == Arity::Multi,
                None => values.len() > 1,
            };
            let value = if multi {
                OptionValue::Many(values.clone())
            } else if let Some(first) = values.first() {
                OptionValue::One(first.clone())
            } else {
                continue;
            };
            self.options.insert(name.clone(), value);
        }
        self
    }
}

/// Outcome of a successful script run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupReport {
    pub script: PathBuf,
    pub tool_calls: usize,
    pub duration: Duration,
}

/// Loads and runs setup scripts.
#[derive(Debug, Clone, Copy)]
pub struct CustomizationRuntime {
    timeout: Duration,
}

impl Default for CustomizationRuntime {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SETUP_TIMEOUT,
        }
    }
}

impl CustomizationRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the script at `script`.
    ///
    /// Returns [`TempletError::SandboxViolation`] when the guard rejects the
    /// source (nothing runs) and [`TempletError::SetupFailed`] for load,
    /// syntax, runtime and timeout failures. The script file is never
    /// modified or removed here.
    pub fn run(
        &self,
        script: &Path,
        context: &ProjectContext,
        tools: &mut dyn ToolSurface,
    ) -> Result<SetupReport> {
        let source = fs::read_to_string(script).map_err(|e| TempletError::SetupFailed {
            script: script.to_path_buf(),
            message: format!("cannot read script: {e}"),
        })?;
        self.run_source(script, &source, context, tools)
    }

    /// Run script text; `script` names it in diagnostics.
    pub fn run_source(
        &self,
        script: &Path,
        source: &str,
        context: &ProjectContext,
        tools: &mut dyn ToolSurface,
    ) -> Result<SetupReport> {
        let module = load(script, source)?;

        tracing::info!("Running setup script {}", script.display());
        let started = Instant::now();
        let mut interpreter = Interpreter::new(context, tools, self.timeout);
        let outcome = interpreter.run(&module);
        let tool_calls = interpreter.tool_calls();

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    "Setup script finished: {} tool calls in {:?}",
                    tool_calls,
                    started.elapsed()
                );
                Ok(SetupReport {
                    script: script.to_path_buf(),
                    tool_calls,
                    duration: started.elapsed(),
                })
            }
            Err(message) => Err(TempletError::SetupFailed {
                script: script.to_path_buf(),
                message,
            }),
        }
    }
}

/// Guard and parse a script without running it.
pub fn load(script: &Path, source: &str) -> Result<Module> {
    let violations = guard::scan(source);
    if !violations.is_empty() {
        tracing::warn!(
            "Setup script {} rejected: {} violation(s)",
            script.display(),
            violations.len()
        );
        return Err(TempletError::SandboxViolation {
            script: script.to_path_buf(),
            violations: violations.iter().map(ToString::to_string).collect(),
        });
    }

    parse_module(source).map_err(|message| TempletError::SetupFailed {
        script: script.to_path_buf(),
        message,
    })
}
