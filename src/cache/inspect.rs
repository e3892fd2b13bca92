//! Read-only classification of cache slots.
//!
//! A slot is the pair `<key>/` (fetched tree) and `<key>.meta.json`
//! (metadata). The two must agree; any disagreement is corruption, and
//! corruption is decided before freshness because a damaged record makes
//! its own timestamp untrustworthy.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::entry::{CacheEntry, CacheMetadata};

/// File system paths that make up one cache slot.
#[derive(Debug, Clone)]
pub struct SlotPaths {
    /// Cache key.
    pub key: String,
    /// Directory holding the fetched tree.
    pub directory: PathBuf,
    /// Metadata record.
    pub metadata: PathBuf,
    /// Advisory lock file.
    pub lock: PathBuf,
}

impl SlotPaths {
    /// Paths for `key` under `root`.
    pub fn new(root: &Path, key: &str) -> Self {
        Self {
            key: key.to_string(),
            directory: root.join(key),
            metadata: root.join(format!("{key}.meta.json")),
            lock: root.join(format!("{key}.lock")),
        }
    }
}

/// Why a slot is considered corrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// Metadata exists but cannot be read or parsed.
    UnreadableMetadata(String),
    /// Metadata exists but the tree is gone.
    DirectoryMissing,
    /// The tree exists without usable metadata.
    MetadataMissing,
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::UnreadableMetadata(reason) => write!(f, "unreadable metadata: {reason}"),
            Corruption::DirectoryMissing => f.write_str("metadata without directory"),
            Corruption::MetadataMissing => f.write_str("directory without metadata"),
        }
    }
}

/// State of a cache slot at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    /// Nothing on disk.
    Missing,
    /// Tree and metadata disagree.
    Corrupted(Corruption),
    /// Entry is intact but past its TTL.
    Stale(CacheEntry),
    /// Entry is intact and within its TTL.
    Fresh(CacheEntry),
}

impl SlotState {
    /// Short label for listings.
    pub fn label(&self) -> &'static str {
        match self {
            SlotState::Missing => "missing",
            SlotState::Corrupted(_) => "corrupted",
            SlotState::Stale(_) => "stale",
            SlotState::Fresh(_) => "fresh",
        }
    }
}

/// Classify a slot without modifying anything.
///
/// `ttl_override` replaces the TTL recorded in the metadata when given.
pub fn inspect_slot(
    paths: &SlotPaths,
    now: DateTime<Utc>,
    ttl_override: Option<u64>,
) -> SlotState {
    let has_metadata = paths.metadata.exists();
    let has_directory = paths.directory.is_dir();

    if !has_metadata {
        return if has_directory || paths.directory.exists() {
            SlotState::Corrupted(Corruption::MetadataMissing)
        } else {
            SlotState::Missing
        };
    }

    let metadata = match read_metadata(&paths.metadata) {
        Ok(metadata) => metadata,
        Err(reason) => return SlotState::Corrupted(Corruption::UnreadableMetadata(reason)),
    };

    if !has_directory {
        return SlotState::Corrupted(Corruption::DirectoryMissing);
    }

    let ttl = ttl_override.unwrap_or(metadata.ttl_hours);
    let stale = metadata.is_stale_at(now, ttl);
    let entry = CacheEntry {
        key: paths.key.clone(),
        directory: paths.directory.clone(),
        metadata,
    };

    if stale {
        SlotState::Stale(entry)
    } else {
        SlotState::Fresh(entry)
    }
}

fn read_metadata(path: &Path) -> Result<CacheMetadata, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
