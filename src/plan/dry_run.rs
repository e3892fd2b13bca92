//! Side-effect-free previews.
//!
//! A dry run reads the cache without locking it for writing, never
//! fetches, and builds the plan with the same [`build_plan`] the real
//! executor uses.

use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

use super::{build_plan, MaterializationOperation};
use crate::cache::{RepoCache, SlotState};
use crate::error::{Result, TempletError};
use crate::locator::RepoLocator;
use crate::template::{self, Template};

/// Plans materializations against the cache without touching disk.
#[derive(Debug, Clone)]
pub struct DryRunEngine<'c> {
    cache: &'c RepoCache,
    ttl_override: Option<u64>,
}

impl<'c> DryRunEngine<'c> {
    pub fn new(cache: &'c RepoCache) -> Self {
        Self {
            cache,
            ttl_override: None,
        }
    }

    /// Judge freshness against `hours` instead of the recorded TTL.
    pub fn with_ttl_override(mut self, hours: Option<u64>) -> Self {
        self.ttl_override = hours;
        self
    }

    /// The operations a real run would perform.
    ///
    /// Fails with [`TempletError::PreviewUnavailable`] unless the
    /// repository is cached and fresh.
    pub fn plan(
        &self,
        locator: &RepoLocator,
        branch: &str,
        template_name: &str,
        target: &Path,
    ) -> Result<Vec<MaterializationOperation>> {
        let template = self.template(locator, branch, template_name)?;
        build_plan(&template, target)
    }

    /// Load a template from a fresh cache entry.
    pub fn template(
        &self,
        locator: &RepoLocator,
        branch: &str,
        template_name: &str,
    ) -> Result<Template> {
        let unavailable = |reason: String| TempletError::PreviewUnavailable {
            locator: locator.to_string(),
            branch: branch.to_string(),
            reason,
        };

        let entry = match self.cache.peek(locator, branch, self.ttl_override)? {
            SlotState::Fresh(entry) => entry,
            SlotState::Stale(entry) => {
                return Err(unavailable(format!(
                    "cached copy expired at {}",
                    entry
                        .metadata
                        .expires_at(self.ttl_override.unwrap_or(entry.metadata.ttl_hours))
                        .format("%Y-%m-%d %H:%M UTC")
                )))
            }
            SlotState::Corrupted(reason) => {
                return Err(unavailable(format!("cache entry is corrupted ({reason})")))
            }
            SlotState::Missing => return Err(unavailable("repository is not cached".to_string())),
        };

        tracing::debug!("Previewing from cache entry {}", entry.key);
        template::find(&entry.directory, template_name)
    }
}

/// Render operations for a human, grouped by kind.
pub fn render(ops: &[MaterializationOperation]) -> String {
    render_groups(ops, &[])
}

/// Render loosely typed entries, tagging ones that are not operations.
pub fn render_entries(entries: &[Value]) -> String {
    let mut ops = Vec::new();
    let mut unrecognized = Vec::new();
    for entry in entries {
        match serde_json::from_value::<MaterializationOperation>(entry.clone()) {
            Ok(op) => ops.push(op),
            Err(_) => unrecognized.push(entry.to_string()),
        }
    }
    render_groups(&ops, &unrecognized)
}

fn render_groups(ops: &[MaterializationOperation], unrecognized: &[String]) -> String {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut scripts = Vec::new();
    for op in ops {
        match op {
            MaterializationOperation::DirectoryCreate { path } => dirs.push(path.display()),
            MaterializationOperation::FileCopy { destination, .. } => {
                files.push(destination.display())
            }
            MaterializationOperation::SetupScript { path, .. } => scripts.push(path.display()),
        }
    }

    let total = ops.len() + unrecognized.len();
    let mut out = format!(
        "Dry run: {total} operation{}\n",
        if total == 1 { "" } else { "s" }
    );
    let mut group = |title: &str, marker: char, lines: Vec<String>| {
        if lines.is_empty() {
            return;
        }
        let _ = writeln!(out, "\n{title} ({}):", lines.len());
        for line in lines {
            let _ = writeln!(out, "  {marker} {line}");
        }
    };

    group(
        "Directories to create",
        '+',
        dirs.iter().map(ToString::to_string).collect(),
    );
    group(
        "Files to copy",
        '+',
        files.iter().map(ToString::to_string).collect(),
    );
    group(
        "Setup script to run",
        '>',
        scripts.iter().map(ToString::to_string).collect(),
    );
    group("Unrecognized entries", '?', unrecognized.to_vec());
    out
}
