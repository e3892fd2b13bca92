//! Repository cache storage.

use anyhow::Context;
use chrono::Utc;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use super::entry::{CacheEntry, CacheMetadata};
use super::inspect::{inspect_slot, SlotPaths, SlotState};
use super::key::{cache_key, is_cache_key};
use super::lock::{lock_exclusive, lock_shared_if_present, SlotLock};
use crate::error::Result;
use crate::fetch::RepoFetcher;
use crate::locator::RepoLocator;
use crate::template;

/// Default time-to-live for cached repositories.
pub const DEFAULT_TTL_HOURS: u64 = 24;

const STAGING_DIR: &str = ".staging";
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);
const SWEEP_LOCK_TIMEOUT: Duration = Duration::from_millis(200);

/// Caller options for a cache lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Treat every entry as a miss.
    pub no_cache: bool,
    /// Replace the TTL recorded with the entry.
    pub ttl_override: Option<u64>,
}

/// Why a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Nothing cached for the key.
    NotCached,
    /// The entry is past its TTL.
    Expired,
    /// The entry was damaged and has been removed.
    Corrupted,
    /// The caller asked to bypass the cache.
    Bypassed,
}

/// Outcome of [`RepoCache::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResolution {
    Hit(CacheEntry),
    Miss(MissReason),
}

/// One slot as reported by [`RepoCache::list`].
#[derive(Debug, Clone)]
pub struct SlotSummary {
    pub key: String,
    pub state: SlotState,
}

/// Content-addressed cache of fetched repositories.
///
/// Each `(repository, branch)` pair owns one slot under the cache root:
/// `<key>/` with the tree, `<key>.meta.json` with its metadata and
/// `<key>.lock` serializing writers. Fetches land in a private staging
/// directory and are moved into place only when complete.
///
/// # Example
///
/// ```
/// use templet::cache::{CacheResolution, MissReason, RepoCache, ResolveOptions};
/// use templet::locator::RepoLocator;
///
/// let root = tempfile::TempDir::new().unwrap();
/// let cache = RepoCache::new(root.path());
/// let repo = RepoLocator::parse("user/repo").unwrap();
///
/// let resolution = cache.resolve(&repo, "main", &ResolveOptions::default()).unwrap();
/// assert_eq!(resolution, CacheResolution::Miss(MissReason::NotCached));
/// ```
#[derive(Debug, Clone)]
pub struct RepoCache {
    root: PathBuf,
    default_ttl_hours: u64,
    lock_timeout: Duration,
}

impl RepoCache {
    /// Create a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_ttl_hours: DEFAULT_TTL_HOURS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set the TTL stamped on newly fetched entries.
    pub fn with_default_ttl(mut self, hours: u64) -> Self {
        self.default_ttl_hours = hours;
        self
    }

    /// Set how long to wait for another process holding a slot.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// TTL stamped on newly fetched entries.
    pub fn default_ttl_hours(&self) -> u64 {
        self.default_ttl_hours
    }

    /// Cache key for a repository and branch.
    pub fn key_for(&self, locator: &RepoLocator, branch: &str) -> String {
        cache_key(locator, branch)
    }

    /// Paths making up the slot for a key.
    pub fn slot(&self, key: &str) -> SlotPaths {
        SlotPaths::new(&self.root, key)
    }

    fn lock_slot(&self, paths: &SlotPaths) -> Result<SlotLock> {
        lock_exclusive(&paths.lock, self.lock_timeout)
    }

    /// Look up a repository without fetching.
    ///
    /// Corrupted slots are torn down and reported as a miss.
    pub fn resolve(
        &self,
        locator: &RepoLocator,
        branch: &str,
        options: &ResolveOptions,
    ) -> Result<CacheResolution> {
        let paths = self.slot(&self.key_for(locator, branch));
        let _lock = self.lock_slot(&paths)?;
        Ok(self.classify(&paths, options))
    }

    /// Return a usable entry, fetching with `fetcher` on a miss.
    ///
    /// The slot lock is held from the freshness check through publication,
    /// so concurrent callers for the same key fetch at most once.
    pub fn ensure(
        &self,
        locator: &RepoLocator,
        branch: &str,
        options: &ResolveOptions,
        fetcher: &dyn RepoFetcher,
    ) -> Result<CacheEntry> {
        let paths = self.slot(&self.key_for(locator, branch));
        let _lock = self.lock_slot(&paths)?;

        match self.classify(&paths, options) {
            CacheResolution::Hit(entry) => Ok(entry),
            CacheResolution::Miss(reason) => {
                tracing::info!("Cache miss for {}#{} ({:?}), fetching", locator, branch, reason);
                let ttl = options.ttl_override.unwrap_or(self.default_ttl_hours);
                self.refresh(&paths, locator, branch, ttl, fetcher)
            }
        }
    }

    /// Classify a slot without changing anything on disk.
    ///
    /// Backs previews: no lock file is created and corruption is reported,
    /// not repaired.
    pub fn peek(
        &self,
        locator: &RepoLocator,
        branch: &str,
        ttl_override: Option<u64>,
    ) -> Result<SlotState> {
        let paths = self.slot(&self.key_for(locator, branch));
        let _lock = lock_shared_if_present(&paths.lock, self.lock_timeout)?;
        Ok(inspect_slot(&paths, Utc::now(), ttl_override))
    }

    /// Remove the entry for a repository and branch.
    pub fn evict(&self, locator: &RepoLocator, branch: &str) -> Result<bool> {
        let paths = self.slot(&self.key_for(locator, branch));
        let lock = self.lock_slot(&paths)?;
        let removed = remove_slot(&paths);
        lock.discard();
        Ok(removed)
    }

    /// Delete every stale or corrupted entry and return how many went.
    ///
    /// Lock files left without a slot are removed too. Slots that are busy
    /// or vanish mid-sweep are skipped; a single bad slot never aborts the
    /// sweep.
    pub fn sweep(&self, ttl_override: Option<u64>) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys(true)? {
            let paths = self.slot(&key);
            let lock = match lock_exclusive(&paths.lock, SWEEP_LOCK_TIMEOUT) {
                Ok(lock) => lock,
                Err(e) => {
                    tracing::warn!("Skipping busy cache slot {}: {}", key, e);
                    continue;
                }
            };

            match inspect_slot(&paths, Utc::now(), ttl_override) {
                SlotState::Stale(_) | SlotState::Corrupted(_) => {
                    if remove_slot(&paths) {
                        removed += 1;
                    }
                    lock.discard();
                }
                SlotState::Missing => lock.discard(),
                SlotState::Fresh(_) => {}
            }
            self.remove_orphaned_staging(&key);
        }
        tracing::info!("Cache sweep removed {} entries", removed);
        Ok(removed)
    }

    /// Every slot with its current state, sorted by key.
    pub fn list(&self) -> Result<Vec<SlotSummary>> {
        let now = Utc::now();
        Ok(self
            .keys(false)?
            .into_iter()
            .map(|key| {
                let state = inspect_slot(&self.slot(&key), now, None);
                SlotSummary { key, state }
            })
            .collect())
    }

    /// Remove every entry and return how many went.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys(true)? {
            let paths = self.slot(&key);
            let Ok(lock) = lock_exclusive(&paths.lock, SWEEP_LOCK_TIMEOUT) else {
                tracing::warn!("Skipping busy cache slot {}", key);
                continue;
            };
            if remove_slot(&paths) {
                removed += 1;
            }
            lock.discard();
        }
        Ok(removed)
    }

    fn classify(&self, paths: &SlotPaths, options: &ResolveOptions) -> CacheResolution {
        let state = inspect_slot(paths, Utc::now(), options.ttl_override);

        if let SlotState::Corrupted(reason) = &state {
            tracing::warn!("Cache slot {} is corrupted ({}); removing", paths.key, reason);
            remove_slot(paths);
            return CacheResolution::Miss(MissReason::Corrupted);
        }
        if options.no_cache {
            return CacheResolution::Miss(MissReason::Bypassed);
        }

        match state {
            SlotState::Fresh(entry) => {
                tracing::debug!("Cache hit for slot {}", paths.key);
                CacheResolution::Hit(entry)
            }
            SlotState::Stale(_) => CacheResolution::Miss(MissReason::Expired),
            SlotState::Missing | SlotState::Corrupted(_) => {
                CacheResolution::Miss(MissReason::NotCached)
            }
        }
    }

    fn refresh(
        &self,
        paths: &SlotPaths,
        locator: &RepoLocator,
        branch: &str,
        ttl_hours: u64,
        fetcher: &dyn RepoFetcher,
    ) -> Result<CacheEntry> {
        let staging_root = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_root)
            .with_context(|| format!("create {}", staging_root.display()))?;

        // Dropping the guard removes whatever was staged if anything below fails.
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}-", paths.key))
            .tempdir_in(&staging_root)?;
        let tree = staging.path().join("tree");

        let outcome = fetcher.fetch(locator, branch, &tree)?;

        let mut metadata = CacheMetadata::new(locator.normalized(), branch, ttl_hours);
        metadata.size_bytes = tree_size(&tree);
        metadata.template_count = template::discover(&tree).len();
        metadata.commit_sha = outcome.commit_sha;

        remove_slot(paths);
        fs::rename(&tree, &paths.directory)
            .with_context(|| format!("publish {}", paths.directory.display()))?;
        write_metadata(&self.root, &paths.metadata, &metadata)?;

        tracing::info!(
            "Cached {}#{} in slot {} ({} bytes, {} templates)",
            locator,
            branch,
            paths.key,
            metadata.size_bytes,
            metadata.template_count
        );

        Ok(CacheEntry {
            key: paths.key.clone(),
            directory: paths.directory.clone(),
            metadata,
        })
    }

    /// Slot keys present under the root, optionally counting bare lock files.
    fn keys(&self, include_locks: bool) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let stem = match name.strip_suffix(".lock") {
                    Some(stem) if include_locks => stem,
                    Some(_) => return None,
                    None => name.strip_suffix(".meta.json").unwrap_or(&name),
                };
                is_cache_key(stem).then(|| stem.to_string())
            })
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn remove_orphaned_staging(&self, key: &str) {
        let Ok(entries) = fs::read_dir(self.root.join(STAGING_DIR)) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if entry.file_name().to_string_lossy().starts_with(key) {
                let _ = fs::remove_dir_all(entry.path());
            }
        }
    }
}

/// Best-effort removal of a slot's tree and metadata.
fn remove_slot(paths: &SlotPaths) -> bool {
    let mut removed = false;
    match fs::remove_dir_all(&paths.directory) {
        Ok(()) => removed = true,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) if paths.directory.is_file() => {
            tracing::debug!("Slot {} directory is a file: {}", paths.key, e);
            removed |= fs::remove_file(&paths.directory).is_ok();
        }
        Err(e) => tracing::warn!("Could not remove {}: {}", paths.directory.display(), e),
    }
    match fs::remove_file(&paths.metadata) {
        Ok(()) => removed = true,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", paths.metadata.display(), e),
    }
    removed
}

/// Replace the metadata record atomically.
fn write_metadata(root: &Path, path: &Path, metadata: &CacheMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata).context("serialize cache metadata")?;
    let mut tmp = tempfile::NamedTempFile::new_in(root)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("persist {}: {}", path.display(), e.error))?;
    Ok(())
}

fn tree_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
