//! Cache key derivation.

use sha2::{Digest, Sha256};

use crate::locator::RepoLocator;

/// Length of a cache key in hex characters.
pub const KEY_LEN: usize = 32;

/// Derive the cache key for a repository and branch.
///
/// The key hashes the normalized locator, so `owner/name` and the full
/// clone URL land in the same slot.
pub fn cache_key(locator: &RepoLocator, branch: &str) -> String {
    let material = format!("{}#{}", locator.normalized(), branch.trim());
    let hash = Sha256::digest(material.as_bytes());
    hex::encode(&hash[..KEY_LEN / 2])
}

/// Whether a directory or file stem looks like a cache key.
pub fn is_cache_key(name: &str) -> bool {
    name.len() == KEY_LEN && name.chars().all(|c| c.is_ascii_hexdigit())
}
