//! Dedup cache: canonical key → previously uploaded artifact handle.
//!
//! A returned handle is an optimistic hint, not a guarantee: handle validity
//! belongs to the transport and is discovered at forward time. Callers that
//! hit a rejected handle must `invalidate` and fall back to a fresh download
//! ("verify by use"); no staleness probe happens before a hit.

use crate::core::metrics;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::storage::canonical::CanonicalKey;
use crate::telegram::transport::FileHandle;

/// One cached delivery. Entries persist until explicitly invalidated;
/// no expiry is enforced.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub handle: FileHandle,
    pub created_at: DateTime<Utc>,
}

/// Shared map of canonical keys to uploaded artifact handles.
///
/// One async mutex over the whole map keeps `put`/`invalidate` atomic per
/// key; last-writer-wins is acceptable since a losing write only costs a
/// future re-download.
pub struct DedupCache {
    entries: Mutex<HashMap<CanonicalKey, CacheEntry>>,
}

/// Point-in-time cache statistics for the admin surface.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a previously uploaded artifact handle.
    ///
    /// No side effects beyond hit/miss accounting.
    pub async fn lookup(&self, key: &CanonicalKey) -> Option<FileHandle> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) => {
                log::debug!("Cache hit for {}", key);
                Some(entry.handle.clone())
            }
            None => {
                log::debug!("Cache miss for {}", key);
                None
            }
        }
    }

    /// Stores a delivered artifact handle, overwriting any existing entry
    /// for the key (last-writer-wins, no versioning).
    pub async fn put(&self, key: CanonicalKey, handle: FileHandle) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            CacheEntry {
                handle,
                created_at: Utc::now(),
            },
        );
    }

    /// Drops the entry for a key whose handle was rejected by the transport.
    pub async fn invalidate(&self, key: &CanonicalKey) {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            log::info!("Invalidated cache entry for {}", key);
            metrics::record_cache_invalidation();
        }
    }

    /// Current entry count plus the process-wide hit/miss counters.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await;
        CacheStats {
            size: entries.len(),
            hits: metrics::CACHE_HIT_TOTAL.get(),
            misses: metrics::CACHE_MISS_TOTAL.get(),
        }
    }

    /// Drops every entry. Admin surface only.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        log::info!("Cache cleared ({} entries)", removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::canonical::canonicalize;
    use url::Url;

    fn key(s: &str) -> CanonicalKey {
        canonicalize(&Url::parse(s).unwrap())
    }

    #[tokio::test]
    async fn test_lookup_empty_cache_returns_none() {
        let cache = DedupCache::new();
        assert!(cache.lookup(&key("https://example.com/v?id=1")).await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_lookup_returns_handle() {
        let cache = DedupCache::new();
        let k = key("https://example.com/v?id=1");
        cache.put(k.clone(), FileHandle("BAAC123".into())).await;

        let found = cache.lookup(&k).await;
        assert_eq!(found, Some(FileHandle("BAAC123".into())));
    }

    #[tokio::test]
    async fn test_put_overwrites_last_writer_wins() {
        let cache = DedupCache::new();
        let k = key("https://example.com/v?id=1");
        cache.put(k.clone(), FileHandle("first".into())).await;
        cache.put(k.clone(), FileHandle("second".into())).await;

        assert_eq!(cache.lookup(&k).await, Some(FileHandle("second".into())));
        assert_eq!(cache.stats().await.size, 1);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = DedupCache::new();
        let k = key("https://example.com/v?id=1");
        cache.put(k.clone(), FileHandle("h".into())).await;
        cache.invalidate(&k).await;

        assert!(cache.lookup(&k).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_missing_key_is_noop() {
        let cache = DedupCache::new();
        cache.invalidate(&key("https://example.com/v?id=404")).await;
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_tracking_noise_maps_to_same_entry() {
        let cache = DedupCache::new();
        cache
            .put(key("https://example.com/v?t=123&id=9"), FileHandle("h".into()))
            .await;

        // Same content, different superficial link → same entry
        assert!(cache.lookup(&key("https://example.com/v?id=9")).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = DedupCache::new();
        cache.put(key("https://example.com/v?id=1"), FileHandle("a".into())).await;
        cache.put(key("https://example.com/v?id=2"), FileHandle("b".into())).await;

        assert_eq!(cache.clear().await, 2);
        assert_eq!(cache.stats().await.size, 0);
    }
}
