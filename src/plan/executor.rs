//! Real execution of a materialization plan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::MaterializationOperation;
use crate::error::{Result, TempletError};
use crate::placeholders::substitute;
use crate::runtime::{CustomizationRuntime, ProjectContext, ProjectTools, SetupReport};

/// What a materialization did.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    pub directories: usize,
    pub files: usize,
    /// Files whose text changed through placeholder substitution.
    pub substituted: usize,
    /// Set when the setup script ran to completion.
    pub setup: Option<SetupReport>,
    /// Set when the setup script failed; its file stays in the project.
    pub setup_error: Option<TempletError>,
}

/// Executes plans built by [`build_plan`](super::build_plan).
#[derive(Debug, Clone)]
pub struct Materializer {
    values: BTreeMap<String, String>,
    runtime: CustomizationRuntime,
}

impl Materializer {
    /// `values` are the resolved placeholder values, keyed by token.
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            runtime: CustomizationRuntime::new(),
        }
    }

    pub fn with_runtime(mut self, runtime: CustomizationRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Execute `ops` into `target`.
    ///
    /// `target` must be absent or empty. If copying fails, the target is
    /// returned to its prior state before the error is returned. A failing
    /// setup script does not fail the call: copied files stay, the script
    /// stays, and the error lands in [`MaterializeReport::setup_error`].
    pub fn execute(
        &self,
        ops: &[MaterializationOperation],
        target: &Path,
        context: &ProjectContext,
    ) -> Result<MaterializeReport> {
        let created = ensure_usable_target(target)?;

        let mut report = MaterializeReport::default();
        if let Err(e) = self.copy_phase(ops, &mut report) {
            tracing::warn!("Materialization failed, cleaning up {}", target.display());
            rollback(target, created);
            return Err(e);
        }
        tracing::info!(
            "Materialized {} directories and {} files into {}",
            report.directories,
            report.files,
            target.display()
        );

        for op in ops {
            if let MaterializationOperation::SetupScript { source, path } = op {
                self.setup_phase(source, path, target, context, &mut report)?;
            }
        }
        Ok(report)
    }

    fn copy_phase(
        &self,
        ops: &[MaterializationOperation],
        report: &mut MaterializeReport,
    ) -> Result<()> {
        for op in ops {
            match op {
                MaterializationOperation::DirectoryCreate { path } => {
                    fs::create_dir_all(path)?;
                    report.directories += 1;
                }
                MaterializationOperation::FileCopy {
                    source,
                    destination,
                } => {
                    if copy_file(source, destination, &self.values)? {
                        report.substituted += 1;
                    }
                    report.files += 1;
                }
                MaterializationOperation::SetupScript { .. } => {}
            }
        }
        Ok(())
    }

    fn setup_phase(
        &self,
        source: &Path,
        path: &Path,
        target: &Path,
        context: &ProjectContext,
        report: &mut MaterializeReport,
    ) -> Result<()> {
        fs::copy(source, path)?;
        let mut tools = ProjectTools::new(target, self.values.clone());
        match self.runtime.run(path, context, &mut tools) {
            Ok(setup) => {
                if let Err(e) = fs::remove_file(path) {
                    tracing::warn!("Could not remove {}: {}", path.display(), e);
                }
                report.setup = Some(setup);
            }
            Err(e) => {
                tracing::debug!("Setup script left in place at {}", path.display());
                report.setup_error = Some(e);
            }
        }
        Ok(())
    }
}

/// Check the target precondition; returns whether the directory is new.
fn ensure_usable_target(target: &Path) -> Result<bool> {
    if !target.exists() {
        return Ok(true);
    }
    let not_empty = || TempletError::TargetNotEmpty {
        path: target.to_path_buf(),
    };
    if !target.is_dir() {
        return Err(not_empty());
    }
    if fs::read_dir(target)?.next().is_some() {
        return Err(not_empty());
    }
    Ok(false)
}

fn rollback(target: &Path, created: bool) {
    if created {
        if let Err(e) = fs::remove_dir_all(target) {
            tracing::warn!("Could not remove {}: {}", target.display(), e);
        }
        return;
    }
    let Ok(entries) = fs::read_dir(target) else {
        return;
    };
    for entry in entries.flatten() {
        let path: PathBuf = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = removed {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// Copy one file, substituting placeholders in UTF-8 text.
///
/// Returns whether substitution changed the content.
fn copy_file(source: &Path, destination: &Path, values: &BTreeMap<String, String>) -> Result<bool> {
    let bytes = fs::read(source)?;
    let changed = match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let replaced = substitute(text, values);
            let changed = replaced != text;
            fs::write(destination, replaced.as_bytes())?;
            changed
        }
        Err(_) => {
            fs::write(destination, &bytes)?;
            false
        }
    };
    fs::set_permissions(destination, fs::metadata(source)?.permissions())?;
    Ok(changed)
}
