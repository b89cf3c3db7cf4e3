//! Local cache adapters
//!
//! [`MemoryCache`] keeps entries in a moka cache for the lifetime of the
//! process. [`FileCache`] persists entries to a JSON object file so they
//! survive restarts, the way a browser's local storage would.

use crate::error::BackendError;
use crate::ports::LocalCache;
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// In-memory local cache backed by moka
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Cache<String, String>,
}

impl MemoryCache {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for MemoryCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) {
        self.inner.insert(key.to_string(), value.to_string()).await;
    }

    async fn remove(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}

/// Durable local cache stored as one JSON object file
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileCache {
    /// Open cache file, starting empty if it does not exist
    ///
    /// A file that exists but is not a UTF-8 JSON object of strings is
    /// treated as empty and overwritten on the next write.
    ///
    /// # Errors
    /// - `BackendError::CacheIo` if the file exists but cannot be read
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), %err, "discarding unreadable cache file");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(BackendError::cache_io(&path, err)),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Cache file location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), BackendError> {
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BackendError::cache_io(parent, e))?;
            }
        }
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| BackendError::cache_io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| BackendError::cache_io(&self.path, e))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&entries).await {
            tracing::warn!(key, %err, "cache entry kept in memory only");
        }
    }

    async fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_none() {
            return;
        }
        if let Err(err) = self.persist(&entries).await {
            tracing::warn!(key, %err, "cache removal not persisted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_set_get_remove() {
        let cache = MemoryCache::new(100);
        assert!(cache.get("content_hero").await.is_none());

        cache.set("content_hero", "Hello").await;
        assert_eq!(cache.get("content_hero").await.as_deref(), Some("Hello"));

        cache.set("content_hero", "Again").await;
        assert_eq!(cache.get("content_hero").await.as_deref(), Some("Again"));

        cache.remove("content_hero").await;
        assert!(cache.get("content_hero").await.is_none());
    }

    #[tokio::test]
    async fn memory_cache_default_capacity() {
        let cache = MemoryCache::default();
        cache.set("k", "v").await;
        cache.inner.run_pending_tasks().await;
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[tokio::test]
    async fn file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = FileCache::open(&path).await.unwrap();
        assert!(cache.is_empty().await);
        cache.set("content_hero", "Hello").await;
        cache.set("content_footer", "Bye").await;
        cache.remove("content_footer").await;
        drop(cache);

        let reopened = FileCache::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.get("content_hero").await.as_deref(), Some("Hello"));
        assert!(reopened.get("content_footer").await.is_none());
    }

    #[tokio::test]
    async fn file_cache_discards_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let cache = FileCache::open(&path).await.unwrap();
        assert!(cache.is_empty().await);

        cache.set("k", "v").await;
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"k\""));
    }

    #[tokio::test]
    async fn file_cache_discards_non_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, [0xff, 0xfe, b'{', 0xfd]).await.unwrap();

        let cache = FileCache::open(&path).await.unwrap();
        assert!(cache.is_empty().await);

        cache.set("k", "v").await;
        let reopened = FileCache::open(&path).await.unwrap();
        assert_eq!(reopened.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn file_cache_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = FileCache::open(&path).await.unwrap();
        cache.set("k", "v").await;

        assert!(path.exists());
        assert_eq!(cache.path(), path.as_path());
    }
}
