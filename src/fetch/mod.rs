//! Repository fetching.
//!
//! A [`RepoFetcher`] materializes a repository tree into a destination
//! directory chosen by the cache. The cache hands fetchers a private staging
//! path, so a fetcher never writes where readers can see it.

pub mod dir;
pub mod git;

pub use dir::DirectoryFetcher;
pub use git::GitFetcher;

use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::locator::{LocatorKind, RepoLocator};

/// Outcome of a successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Commit the tree was taken from, when the source is versioned.
    pub commit_sha: Option<String>,
}

/// Materializes repository trees.
pub trait RepoFetcher: Send + Sync {
    /// Fetch `branch` of `locator` into `dest`, which must not exist yet.
    fn fetch(&self, locator: &RepoLocator, branch: &str, dest: &Path) -> Result<FetchOutcome>;
}

/// Pick the fetcher that fits a locator.
///
/// Local directories that are not git checkouts are copied; everything
/// else goes through git.
pub fn fetcher_for(locator: &RepoLocator, timeout: Duration) -> Box<dyn RepoFetcher> {
    match locator.kind() {
        LocatorKind::Local(path) if path.is_dir() && !is_git_repository(path) => {
            Box::new(DirectoryFetcher::new())
        }
        _ => Box::new(GitFetcher::new(timeout)),
    }
}

fn is_git_repository(path: &Path) -> bool {
    path.join(".git").exists() || (path.join("HEAD").is_file() && path.join("objects").is_dir())
}
