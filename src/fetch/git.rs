//! Git repository fetching.
//!
//! Shallow-clones a single branch into the staging directory the cache
//! provides, records the HEAD commit, and strips `.git` so the cached tree
//! holds only template content. Every git invocation runs under the
//! fetcher's deadline; a clone that overruns is killed.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{FetchOutcome, RepoFetcher};
use crate::error::{Result, TempletError};
use crate::locator::RepoLocator;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fetches repositories with the `git` executable.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    timeout: Duration,
}

impl GitFetcher {
    /// Create a git fetcher with a per-command timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-command timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run_git(&self, locator: &RepoLocator, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!("git {}", args.join(" "));
        let mut child = cmd.spawn().map_err(|e| TempletError::FetchFailed {
            locator: locator.to_string(),
            message: format!("could not start git: {e}"),
        })?;

        // Both pipes are drained concurrently with the deadline poll.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TempletError::Timeout {
                    operation: format!("git {} for {}", args[0], locator),
                    seconds: self.timeout.as_secs(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        if !status.success() {
            return Err(TempletError::FetchFailed {
                locator: locator.to_string(),
                message: format!(
                    "git {} failed: {}",
                    args[0],
                    String::from_utf8_lossy(&stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

/// Read a pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

impl RepoFetcher for GitFetcher {
    fn fetch(&self, locator: &RepoLocator, branch: &str, dest: &Path) -> Result<FetchOutcome> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let dest_str = dest.to_string_lossy();
        self.run_git(
            locator,
            &[
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--branch",
                branch,
                locator.clone_url(),
                dest_str.as_ref(),
            ],
            None,
        )?;

        let commit_sha = self.run_git(locator, &["rev-parse", "HEAD"], Some(dest))?;
        std::fs::remove_dir_all(dest.join(".git"))?;

        tracing::info!("Fetched {}#{} at {}", locator, branch, commit_sha);
        Ok(FetchOutcome {
            commit_sha: Some(commit_sha),
        })
    }
}
