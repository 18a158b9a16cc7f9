//! Keyed storage for conditional-fetch cache entries.
//!
//! Entries are keyed by the SHA-256 of the request URL and hold the body
//! plus the validators needed for the next conditional request. There is
//! no eviction and no TTL: the crawl target is small and a stale entry is
//! always revalidated by the server before it is reused.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A cached response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub body: String,
}

/// Cache key for a URL: lowercase hex SHA-256.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Key-value store behind the fetch cache.
pub trait CacheStore: Send + Sync {
    /// Look up an entry. Unreadable entries are reported as absent.
    fn get(&self, key: &str) -> Option<CacheEntry>;
    /// Store an entry, replacing any previous one.
    fn put(&self, key: &str, entry: &CacheEntry) -> Result<()>;
}

/// One JSON file per key under a directory.
///
/// Writes are whole-file replacements, so concurrent writers of different
/// keys never interfere and writers of the same key resolve to the last
/// write.
pub struct FsCacheStore {
    dir: PathBuf,
}

impl FsCacheStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache dir: {}", dir.display()))?;
        tracing::debug!("http cache at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheStore for FsCacheStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let raw = std::fs::read_to_string(self.path_for(key)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("ignoring corrupt cache entry {key}: {e}");
                None
            }
        }
    }

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let path = self.path_for(key);
        let json = serde_json::to_string(entry)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write cache file: {}", path.display()))
    }
}

/// In-process store, mainly for tests.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))?
            .insert(key.to_string(), entry.clone());
        Ok(())
    }
}
