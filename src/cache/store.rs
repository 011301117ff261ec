// Cache store for reading and writing cached data.
// Handles TTL checking, shared in-memory entries and optional JSON files on disk.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::Result;

use super::paths::entry_path;

/// Default TTL for cached API results: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Wrapper for cached data with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    /// The cached data.
    pub data: T,
    /// When the data was stored.
    pub stored_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T, stored_at: DateTime<Utc>) -> Self {
        Self { data, stored_at }
    }

    /// Check if this entry is still valid at `now`: `now - stored_at < ttl`.
    /// Entries stored in the future are treated as expired.
    pub fn is_valid_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let elapsed = now
            .signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::MAX);

        elapsed < ttl
    }

    /// Check if this entry has expired at `now`.
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(ttl, now)
    }
}

/// Keyed store with time-based validity.
///
/// Clones share the same entries. There is no eviction: an expired entry
/// stays until the key is written again, and concurrent writers to one key
/// resolve as last write wins.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    entries: Arc<RwLock<HashMap<String, CachedData<V>>>>,
    ttl: Duration,
    dir: Option<PathBuf>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            dir: None,
        }
    }

    /// Mirror entries to JSON files under `dir`.
    pub fn with_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dir = dir;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a valid entry.
    pub fn lookup(&self, key: &str) -> Option<V> {
        self.lookup_at(key, Utc::now())
    }

    /// Look up an entry as of `now`. Expired entries are treated as absent.
    pub fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(key) {
                return entry
                    .is_valid_at(self.ttl, now)
                    .then(|| entry.data.clone());
            }
        }

        let path = entry_path(self.dir.as_deref()?, key);
        match read_cached::<V>(&path) {
            Ok(Some(entry)) if entry.is_valid_at(self.ttl, now) => {
                debug!(key, path = %path.display(), "Loaded cache entry from disk");
                let data = entry.data.clone();
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.to_string(), entry);
                Some(data)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable cache file");
                None
            }
        }
    }

    /// Store a value stamped with the current time.
    pub fn store(&self, key: &str, value: V) {
        self.store_at(key, value, Utc::now());
    }

    /// Store a value stamped with `stored_at`, replacing any previous entry.
    pub fn store_at(&self, key: &str, value: V, stored_at: DateTime<Utc>) {
        let entry = CachedData::new(value, stored_at);

        if let Some(dir) = &self.dir {
            let path = entry_path(dir, key);
            if let Err(e) = write_cached(&path, &entry) {
                warn!(key, error = %e, "Failed to persist cache entry");
            }
        }

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    /// Number of keys held in memory, valid or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a cached JSON entry from a file.
fn read_cached<T: DeserializeOwned>(path: &Path) -> Result<Option<CachedData<T>>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let cached: CachedData<T> = serde_json::from_str(&contents)?;
    Ok(Some(cached))
}

/// Write a cached entry as JSON.
fn write_cached<T: Serialize>(path: &Path, entry: &CachedData<T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn sample() -> TestData {
        TestData {
            name: "test".to_string(),
            value: 42,
        }
    }

    #[test]
    fn test_lookup_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.store_at("user:test", sample(), t0);

        let just_before = t0 + chrono::Duration::seconds(299);
        assert_eq!(cache.lookup_at("user:test", just_before), Some(sample()));
    }

    #[test]
    fn test_lookup_after_ttl_is_absent() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.store_at("user:test", sample(), t0);

        let just_after = t0 + chrono::Duration::seconds(301);
        assert_eq!(cache.lookup_at("user:test", just_after), None);

        // Exactly at the TTL boundary the entry is no longer valid.
        let at_ttl = t0 + chrono::Duration::seconds(300);
        assert_eq!(cache.lookup_at("user:test", at_ttl), None);
    }

    #[test]
    fn test_overwrite_refreshes_entry() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let t0 = Utc::now();
        cache.store_at("k", 1u32, t0);
        let later = t0 + chrono::Duration::seconds(20);
        assert_eq!(cache.lookup_at("k", later), None);

        cache.store_at("k", 2u32, later);
        assert_eq!(cache.lookup_at("k", later), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let other = cache.clone();
        other.store("k", "v".to_string());
        assert_eq!(cache.lookup("k"), Some("v".to_string()));
        assert!(cache.lookup("missing").is_none());
    }

    #[test]
    fn test_future_entry_is_expired() {
        let now = Utc::now();
        let entry = CachedData::new("x", now + chrono::Duration::seconds(60));
        assert!(entry.is_expired_at(DEFAULT_TTL, now));
    }

    #[test]
    fn test_disk_entries_survive_new_cache() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Some(temp_dir.path().to_path_buf());

        let first = TtlCache::new(DEFAULT_TTL).with_dir(dir.clone());
        first.store("repos:test", vec![sample()]);
        assert!(temp_dir.path().join("repos_test.json").exists());

        let second: TtlCache<Vec<TestData>> = TtlCache::new(DEFAULT_TTL).with_dir(dir);
        assert!(second.is_empty());
        assert_eq!(second.lookup("repos:test"), Some(vec![sample()]));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_expired_disk_entry_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Some(temp_dir.path().to_path_buf());
        let t0 = Utc::now() - chrono::Duration::seconds(600);

        let first = TtlCache::new(DEFAULT_TTL).with_dir(dir.clone());
        first.store_at("user:test", sample(), t0);

        let second: TtlCache<TestData> = TtlCache::new(DEFAULT_TTL).with_dir(dir);
        assert!(second.lookup("user:test").is_none());
    }

    #[test]
    fn test_corrupt_disk_entry_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("user_bad.json"), "not json").unwrap();

        let cache: TtlCache<TestData> =
            TtlCache::new(DEFAULT_TTL).with_dir(Some(temp_dir.path().to_path_buf()));
        assert!(cache.lookup("user:bad").is_none());
    }
}
