// Cache module for API results.
// Keeps profiles and repository lists for a TTL, optionally mirrored to disk.

pub mod paths;
pub mod store;

pub use paths::{cache_dir, entry_path};
pub use store::{CachedData, DEFAULT_TTL, TtlCache};

/// Cache key for a profile lookup.
pub fn profile_key(name: &str) -> String {
    format!("user:{}", normalize(name))
}

/// Cache key for a full repository listing.
pub fn repos_key(name: &str) -> String {
    format!("repos:{}", normalize(name))
}

// Account names are case-insensitive on GitHub.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
