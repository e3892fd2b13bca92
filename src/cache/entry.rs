//! Cache entry and metadata types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata persisted beside each cached repository tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Normalized locator the tree was fetched from.
    pub locator: String,
    /// Branch that was fetched.
    pub branch: String,
    /// When the tree was last fetched.
    pub refreshed_at: DateTime<Utc>,
    /// Time-to-live in hours, recorded at fetch time.
    pub ttl_hours: u64,
    /// Size of the tree in bytes.
    pub size_bytes: u64,
    /// Number of templates discovered in the tree.
    pub template_count: usize,
    /// Commit the tree was fetched at, when known.
    #[serde(default)]
    pub commit_sha: Option<String>,
}

impl CacheMetadata {
    /// Create metadata stamped with the current time.
    pub fn new(locator: impl Into<String>, branch: impl Into<String>, ttl_hours: u64) -> Self {
        Self {
            locator: locator.into(),
            branch: branch.into(),
            refreshed_at: Utc::now(),
            ttl_hours,
            size_bytes: 0,
            template_count: 0,
            commit_sha: None,
        }
    }

    /// Age of the entry at `now`.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.refreshed_at)
    }

    /// Whether the entry is stale at `now` for the given TTL.
    ///
    /// An entry exactly `ttl_hours` old is still fresh.
    pub fn is_stale_at(&self, now: DateTime<Utc>, ttl_hours: u64) -> bool {
        now > self.expires_at(ttl_hours)
    }

    /// When the entry expires under the given TTL.
    ///
    /// TTLs too large to represent never expire.
    pub fn expires_at(&self, ttl_hours: u64) -> DateTime<Utc> {
        ttl_duration(ttl_hours)
            .and_then(|ttl| self.refreshed_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn ttl_duration(hours: u64) -> Option<Duration> {
    i64::try_from(hours).ok().and_then(Duration::try_hours)
}

/// A cached repository resident on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Cache key (hash of normalized locator and branch).
    pub key: String,
    /// Directory holding the fetched tree.
    pub directory: PathBuf,
    /// Persisted metadata.
    pub metadata: CacheMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_refreshed(ago: Duration) -> CacheMetadata {
        let mut meta = CacheMetadata::new("github.com/user/repo", "main", 24);
        meta.refreshed_at = Utc::now() - ago;
        meta
    }

    #[test]
    fn fresh_just_inside_ttl() {
        let now = Utc::now();
        let mut meta = CacheMetadata::new("x", "main", 24);
        meta.refreshed_at = now - Duration::hours(23) - Duration::minutes(59);
        assert!(!meta.is_stale_at(now, 24));
    }

    #[test]
    fn stale_just_past_ttl() {
        let now = Utc::now();
        let mut meta = CacheMetadata::new("x", "main", 24);
        meta.refreshed_at = now - Duration::hours(24) - Duration::minutes(1);
        assert!(meta.is_stale_at(now, 24));
    }

    #[test]
    fn override_ttl_shortens_freshness() {
        let now = Utc::now();
        let mut meta = CacheMetadata::new("x", "main", 24);
        meta.refreshed_at = now - Duration::hours(1) - Duration::minutes(1);
        assert!(!meta.is_stale_at(now, 24));
        assert!(meta.is_stale_at(now, 1));
    }

    #[test]
    fn expires_at_adds_ttl() {
        let meta = metadata_refreshed(Duration::zero());
        assert_eq!(
            meta.expires_at(2) - meta.refreshed_at,
            Duration::hours(2)
        );
    }

    #[test]
    fn huge_ttl_never_expires() {
        let now = Utc::now();
        let mut meta = CacheMetadata::new("x", "main", 24);
        meta.refreshed_at = now - Duration::days(365);
        assert!(!meta.is_stale_at(now, 10_000_000_000_000_000));
        assert!(!meta.is_stale_at(now, u64::MAX));
        assert_eq!(meta.expires_at(u64::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn metadata_round_trips_without_commit() {
        let json = r#"{
            "locator": "github.com/user/repo",
            "branch": "main",
            "refreshed_at": "2026-01-01T00:00:00Z",
            "ttl_hours": 24,
            "size_bytes": 10,
            "template_count": 2
        }"#;
        let meta: CacheMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.commit_sha, None);
        assert_eq!(meta.template_count, 2);
    }
}
