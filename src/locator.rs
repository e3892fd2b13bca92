//! Repository locators.
//!
//! Callers spell the same repository in several ways: `owner/name`,
//! `github:owner/name`, `https://github.com/owner/name.git`,
//! `git@github.com:owner/name.git`, or a local path. [`RepoLocator`] reduces
//! every spelling to one normalized form so a repository and branch always
//! map to a single cache slot.
//!
//! # Example
//!
//! ```
//! use templet::locator::RepoLocator;
//!
//! let short = RepoLocator::parse("Acme/Starter").unwrap();
//! let full = RepoLocator::parse("https://github.com/acme/starter.git").unwrap();
//! assert_eq!(short.normalized(), full.normalized());
//! assert_eq!(short.normalized(), "github.com/acme/starter");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Result, TempletError};

const DEFAULT_HOST: &str = "github.com";

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.-]+$").expect("valid segment regex"));

/// Where a repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorKind {
    /// Hosted repository reachable over the network.
    Remote,
    /// Repository on the local filesystem.
    Local(PathBuf),
}

/// A parsed, normalized repository locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocator {
    input: String,
    normalized: String,
    clone_url: String,
    kind: LocatorKind,
}

impl RepoLocator {
    /// Parse a locator from user input.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "locator is empty"));
        }

        if let Some(path) = trimmed.strip_prefix("file://") {
            return Ok(Self::local(input, Path::new(path)));
        }
        if is_path_like(trimmed) {
            return Ok(Self::local(input, Path::new(trimmed)));
        }
        if let Some(rest) = trimmed.strip_prefix("github:") {
            return Self::hosted(input, DEFAULT_HOST, rest, None);
        }
        if let Some(rest) = trimmed.strip_prefix("git@") {
            let (host, path) = rest
                .split_once(':')
                .ok_or_else(|| invalid(input, "expected git@host:owner/name"))?;
            return Self::hosted(input, host, path, Some(trimmed.to_string()));
        }
        if trimmed.contains("://") {
            let url = Url::parse(trimmed).map_err(|e| invalid(input, &e.to_string()))?;
            let host = url
                .host_str()
                .ok_or_else(|| invalid(input, "URL has no host"))?;
            return Self::hosted(input, host, url.path(), Some(trimmed.to_string()));
        }

        let segments: Vec<&str> = trimmed.trim_end_matches('/').split('/').collect();
        match segments.as_slice() {
            [_, _] => Self::hosted(input, DEFAULT_HOST, trimmed, None),
            [host, rest @ ..] if host.contains('.') && rest.len() >= 2 => {
                Self::hosted(input, host, &rest.join("/"), None)
            }
            _ => Err(invalid(input, "expected owner/name, a URL, or a local path")),
        }
    }

    fn hosted(input: &str, host: &str, path: &str, explicit_url: Option<String>) -> Result<Self> {
        let host = host.to_ascii_lowercase();
        let path = path
            .trim_matches('/')
            .trim_end_matches(".git")
            .trim_end_matches('/')
            .to_ascii_lowercase();

        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() < 2 || parts.iter().any(|p| !SEGMENT.is_match(p)) {
            return Err(invalid(input, "repository path must look like owner/name"));
        }

        let clone_url = explicit_url.unwrap_or_else(|| format!("https://{host}/{path}.git"));

        Ok(Self {
            input: input.to_string(),
            normalized: format!("{host}/{path}"),
            clone_url,
            kind: LocatorKind::Remote,
        })
    }

    fn local(input: &str, path: &Path) -> Self {
        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let display = resolved.to_string_lossy().trim_end_matches('/').to_string();
        Self {
            input: input.to_string(),
            normalized: format!("file:{display}"),
            clone_url: display,
            kind: LocatorKind::Local(resolved),
        }
    }

    /// The caller's original spelling.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Canonical form used for hashing.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// URL or path handed to the fetcher.
    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    /// Whether the repository is remote or local.
    pub fn kind(&self) -> &LocatorKind {
        &self.kind
    }
}

impl fmt::Display for RepoLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn is_path_like(input: &str) -> bool {
    input.starts_with('/')
        || input.starts_with("./")
        || input.starts_with("../")
        || input.starts_with('.') && input.len() == 1
        || Path::new(input).is_absolute()
}

fn invalid(input: &str, message: &str) -> TempletError {
    TempletError::InvalidLocator {
        input: input.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bare_owner_name_defaults_to_github() {
        let loc = RepoLocator::parse("user/repo").unwrap();
        assert_eq!(loc.normalized(), "github.com/user/repo");
        assert_eq!(loc.clone_url(), "https://github.com/user/repo.git");
        assert_eq!(loc.kind(), &LocatorKind::Remote);
    }

    #[test]
    fn equivalent_spellings_normalize_identically() {
        let spellings = [
            "user/repo",
            "User/Repo",
            "github:user/repo",
            "https://github.com/user/repo",
            "https://github.com/user/repo.git",
            "https://github.com/user/repo/",
            "git@github.com:user/repo.git",
            "github.com/user/repo",
        ];
        for spelling in spellings {
            let loc = RepoLocator::parse(spelling).unwrap();
            assert_eq!(loc.normalized(), "github.com/user/repo", "{spelling}");
        }
    }

    #[test]
    fn explicit_url_is_kept_for_cloning() {
        let loc = RepoLocator::parse("git@github.com:user/repo.git").unwrap();
        assert_eq!(loc.clone_url(), "git@github.com:user/repo.git");
    }

    #[test]
    fn other_hosts_are_preserved() {
        let loc = RepoLocator::parse("https://gitlab.com/group/sub/project").unwrap();
        assert_eq!(loc.normalized(), "gitlab.com/group/sub/project");
    }

    #[test]
    fn local_paths_use_file_prefix() {
        let temp = TempDir::new().unwrap();
        let loc = RepoLocator::parse(&temp.path().to_string_lossy()).unwrap();
        assert!(loc.normalized().starts_with("file:"));
        assert!(matches!(loc.kind(), LocatorKind::Local(_)));

        let via_scheme =
            RepoLocator::parse(&format!("file://{}", temp.path().to_string_lossy())).unwrap();
        assert_eq!(loc.normalized(), via_scheme.normalized());
    }

    #[test]
    fn rejects_garbage() {
        assert!(RepoLocator::parse("").is_err());
        assert!(RepoLocator::parse("justaname").is_err());
        assert!(RepoLocator::parse("a/b c").is_err());
        assert!(RepoLocator::parse("https://github.com/onlyowner").is_err());
    }
}
