//! Fetching from plain local directories.

use anyhow::Context;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{FetchOutcome, RepoFetcher};
use crate::error::{Result, TempletError};
use crate::locator::{LocatorKind, RepoLocator};

/// Copies an unversioned local directory. The branch is ignored.
#[derive(Debug, Default)]
pub struct DirectoryFetcher;

impl DirectoryFetcher {
    /// Create a directory fetcher.
    pub fn new() -> Self {
        Self
    }
}

impl RepoFetcher for DirectoryFetcher {
    fn fetch(&self, locator: &RepoLocator, _branch: &str, dest: &Path) -> Result<FetchOutcome> {
        let LocatorKind::Local(source) = locator.kind() else {
            return Err(TempletError::FetchFailed {
                locator: locator.to_string(),
                message: "directory fetcher only handles local paths".to_string(),
            });
        };
        if !source.is_dir() {
            return Err(TempletError::FetchFailed {
                locator: locator.to_string(),
                message: format!("{} is not a directory", source.display()),
            });
        }

        copy_tree(source, dest)?;
        Ok(FetchOutcome::default())
    }
}

fn copy_tree(source: &Path, dest: &Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry?;
        let rel = entry.path().strip_prefix(source)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}
