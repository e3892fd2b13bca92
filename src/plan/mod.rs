//! Materialization plans.
//!
//! A plan is the ordered list of filesystem operations that turn a cached
//! template into a project. [`build_plan`] is the single source of that
//! list: the [`Materializer`] executes it and the [`DryRunEngine`] renders
//! it, so a preview can never drift from a real run.
//!
//! Ordering is deterministic. The target root comes first, then the
//! template tree in pre-order with entries sorted by name, so every
//! directory precedes the files it contains. The setup script, if the
//! template declares one, is always last.

pub mod dry_run;
pub mod executor;

pub use dry_run::{render, render_entries, DryRunEngine};
pub use executor::{MaterializeReport, Materializer};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::template::Template;

/// One filesystem step of a materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterializationOperation {
    /// Create `path` (absolute, under the target).
    DirectoryCreate { path: PathBuf },
    /// Copy a template file to `destination`, substituting placeholders.
    FileCopy {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Copy the setup script to `path` and run it there.
    SetupScript { source: PathBuf, path: PathBuf },
}

impl MaterializationOperation {
    /// Kind label used for grouping.
    pub fn kind(&self) -> &'static str {
        match self {
            MaterializationOperation::DirectoryCreate { .. } => "directory_create",
            MaterializationOperation::FileCopy { .. } => "file_copy",
            MaterializationOperation::SetupScript { .. } => "setup_script",
        }
    }

    /// The path this operation writes.
    pub fn target_path(&self) -> &Path {
        match self {
            MaterializationOperation::DirectoryCreate { path } => path,
            MaterializationOperation::FileCopy { destination, .. } => destination,
            MaterializationOperation::SetupScript { path, .. } => path,
        }
    }
}

/// Build the plan for materializing `template` into `target`.
pub fn build_plan(template: &Template, target: &Path) -> Result<Vec<MaterializationOperation>> {
    let mut ops = Vec::new();
    let mut walker = WalkDir::new(&template.content_root)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(anyhow::Error::from)?;
        let path = entry.path();

        if entry.depth() > 0 && template.is_excluded(path) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let relative = path
            .strip_prefix(&template.content_root)
            .map_err(anyhow::Error::from)?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            ops.push(MaterializationOperation::DirectoryCreate { path: destination });
        } else {
            ops.push(MaterializationOperation::FileCopy {
                source: path.to_path_buf(),
                destination,
            });
        }
    }

    if let Some(script) = template.setup_script().filter(|s| s.is_file()) {
        if let Some(name) = script.file_name() {
            ops.push(MaterializationOperation::SetupScript {
                path: target.join(name),
                source: script,
            });
        }
    }

    tracing::debug!(
        "Planned {} operations for template {}",
        ops.len(),
        template.name
    );
    Ok(ops)
}

/// Operation counts as (directories, files, scripts).
pub fn counts(ops: &[MaterializationOperation]) -> (usize, usize, usize) {
    ops.iter().fold((0, 0, 0), |(d, f, s), op| match op {
        MaterializationOperation::DirectoryCreate { .. } => (d + 1, f, s),
        MaterializationOperation::FileCopy { .. } => (d, f + 1, s),
        MaterializationOperation::SetupScript { .. } => (d, f, s + 1),
    })
}
