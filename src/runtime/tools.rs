//! Capabilities exposed to setup scripts.
//!
//! Scripts never touch the filesystem directly. Every effect goes through a
//! [`ToolSurface`], and [`ProjectTools`] confines every path it is given to
//! the project directory.

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::edit::{self, TextEdit};
use super::ide::{preset_files, PRESETS};
use super::json_edit::{self, JsonEdit};
use crate::error::{Result, TempletError};
use crate::placeholders::{canonical_token, substitute};

/// Operations a setup script may perform.
pub trait ToolSurface {
    /// Substitute placeholders in `files`, returning how many changed.
    ///
    /// `values` adds to or overrides the resolved placeholder values.
    fn replace_placeholders(
        &mut self,
        files: &[String],
        values: Option<&BTreeMap<String, String>>,
    ) -> Result<usize>;

    /// Apply an IDE preset, returning the files written.
    fn apply_ide_preset(&mut self, preset: &str) -> Result<Vec<String>>;

    /// Apply a text edit to one file.
    fn edit_text(&mut self, path: &str, edit: &TextEdit) -> Result<()>;

    /// Apply a JSON edit to one file, creating it when missing.
    fn edit_json(&mut self, path: &str, edit: &JsonEdit) -> Result<()>;
}

/// Tools operating on a real project directory.
#[derive(Debug, Clone)]
pub struct ProjectTools {
    root: PathBuf,
    values: BTreeMap<String, String>,
}

impl ProjectTools {
    pub fn new(root: impl Into<PathBuf>, values: BTreeMap<String, String>) -> Self {
        Self {
            root: root.into(),
            values,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a script-supplied path inside the project.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        confine(&self.root, path)
    }

    fn read(&self, path: &str) -> Result<(PathBuf, String)> {
        let full = self.resolve(path)?;
        let text = fs::read_to_string(&full).with_context(|| format!("read {path}"))?;
        Ok((full, text))
    }
}

impl ToolSurface for ProjectTools {
    fn replace_placeholders(
        &mut self,
        files: &[String],
        values: Option<&BTreeMap<String, String>>,
    ) -> Result<usize> {
        let mut merged = self.values.clone();
        if let Some(extra) = values {
            for (k, v) in extra {
                merged.insert(canonical_token(k), v.clone());
            }
        }

        let mut changed = 0;
        for file in files {
            let (full, text) = self.read(file)?;
            let replaced = substitute(&text, &merged);
            if replaced != text {
                fs::write(&full, replaced.as_bytes())?;
                changed += 1;
            }
        }
        tracing::debug!("Substituted placeholders in {} of {} files", changed, files.len());
        Ok(changed)
    }

    fn apply_ide_preset(&mut self, preset: &str) -> Result<Vec<String>> {
        let files = preset_files(preset).ok_or_else(|| {
            TempletError::validation(format!(
                "unknown IDE preset '{preset}' (available: {})",
                PRESETS.join(", ")
            ))
        })?;

        let mut written = Vec::new();
        for file in files {
            let full = self.resolve(file.path)?;
            let mut doc = if full.is_file() {
                let text = fs::read_to_string(&full)?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse existing {}", file.path))?
            } else {
                Value::Null
            };
            json_edit::deep_merge(&mut doc, &file.content);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full, json_edit::to_pretty(&doc).map_err(anyhow::Error::msg)?)?;
            written.push(file.path.to_string());
        }
        tracing::info!("Applied IDE preset {}", preset);
        Ok(written)
    }

    fn edit_text(&mut self, path: &str, text_edit: &TextEdit) -> Result<()> {
        let (full, text) = self.read(path)?;
        let updated = edit::apply(&text, text_edit).map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        fs::write(&full, updated)?;
        Ok(())
    }

    fn edit_json(&mut self, path: &str, json: &JsonEdit) -> Result<()> {
        let full = self.resolve(path)?;
        let mut doc = if full.is_file() {
            let text = fs::read_to_string(&full)?;
            serde_json::from_str(&text).with_context(|| format!("parse {path}"))?
        } else {
            Value::Null
        };
        json_edit::apply(&mut doc, json).map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, json_edit::to_pretty(&doc).map_err(anyhow::Error::msg)?)?;
        Ok(())
    }
}

/// Join `path` onto `root`, refusing absolute paths and `..` escapes.
pub fn confine(root: &Path, path: &str) -> Result<PathBuf> {
    let escape = || TempletError::PathEscape {
        path: path.to_string(),
    };
    if path.trim().is_empty() {
        return Err(escape());
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop().ok_or_else(escape)?;
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    if parts.is_empty() {
        return Err(escape());
    }
    Ok(parts.iter().fold(root.to_path_buf(), |acc, p| acc.join(p)))
}

/// A tool invocation captured by [`RecordingTools`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    ReplacePlaceholders {
        files: Vec<String>,
        values: Option<BTreeMap<String, String>>,
    },
    ApplyIde {
        preset: String,
    },
    EditText {
        path: String,
        edit: TextEdit,
    },
    EditJson {
        path: String,
        edit: JsonEdit,
    },
}

/// Tool surface that records calls and touches nothing.
#[derive(Debug, Default)]
pub struct RecordingTools {
    pub calls: Vec<ToolCall>,
}

impl RecordingTools {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToolSurface for RecordingTools {
    fn replace_placeholders(
        &mut self,
        files: &[String],
        values: Option<&BTreeMap<String, String>>,
    ) -> Result<usize> {
        self.calls.push(ToolCall::ReplacePlaceholders {
            files: files.to_vec(),
            values: values.cloned(),
        });
        Ok(files.len())
    }

    fn apply_ide_preset(&mut self, preset: &str) -> Result<Vec<String>> {
        self.calls.push(ToolCall::ApplyIde {
            preset: preset.to_string(),
        });
        Ok(Vec::new())
    }

    fn edit_text(&mut self, path: &str, edit: &TextEdit) -> Result<()> {
        self.calls.push(ToolCall::EditText {
            path: path.to_string(),
            edit: edit.clone(),
        });
        Ok(())
    }

    fn edit_json(&mut self, path: &str, edit: &JsonEdit) -> Result<()> {
        self.calls.push(ToolCall::EditJson {
            path: path.to_string(),
            edit: edit.clone(),
        });
        Ok(())
    }
}
