//! Repository cache.
//!
//! Fetched repositories are kept on disk under a content-addressed key so
//! repeated provisioning runs skip the network. Entries carry a TTL; damaged
//! entries are detected and torn down before they are ever used.

pub mod entry;
pub mod inspect;
pub mod key;
pub mod lock;
pub mod store;

pub use entry::{CacheEntry, CacheMetadata};
pub use inspect::{inspect_slot, Corruption, SlotPaths, SlotState};
pub use key::cache_key;
pub use store::{
    CacheResolution, MissReason, RepoCache, ResolveOptions, SlotSummary, DEFAULT_TTL_HOURS,
};

/// Get the default cache directory.
pub fn default_cache_dir() -> std::path::PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("templet")
        .join("repos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_dir_valid() {
        let path = default_cache_dir();
        assert!(path.ends_with("templet/repos"));
    }
}
