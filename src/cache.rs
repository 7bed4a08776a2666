//! In-memory source metadata cache.
//!
//! Parsed [`MediaInfo`] is kept per source path so playlist and segment
//! requests against the same source only decode the `moov` once per TTL.

use dashmap::DashMap;
use hlsforge_media::MediaInfo;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    info: Arc<MediaInfo>,
    inserted_at: Instant,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe TTL cache of source metadata.
pub struct MetadataCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetadataCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached metadata of `source`, unless missing or expired.
    pub fn get(&self, source: &str) -> Option<Arc<MediaInfo>> {
        let expired = match self.entries.get(source) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.info));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(source);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, source: &str, info: Arc<MediaInfo>) {
        if !self.entries.contains_key(source) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        self.entries.insert(
            source.to_string(),
            CacheEntry {
                info,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove an entry. Returns whether it was present.
    pub fn remove(&self, source: &str) -> bool {
        self.entries.remove(source).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop expired entries and return how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired metadata");
        }
        removed
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            tracing::debug!(source = %key, "Evicting cached metadata");
            self.entries.remove(&key);
        }
    }
}

/// Start a background task that periodically drops expired entries.
///
/// The sweep runs at 40% of the TTL, at least once per second.
pub fn start_sweep_task(cache: Arc<MetadataCache>) -> tokio::task::JoinHandle<()> {
    let period = cache.ttl.mul_f64(0.4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            cache.cleanup_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> Arc<MediaInfo> {
        Arc::new(MediaInfo::default())
    }

    #[test]
    fn test_insert_and_get() {
        let cache = MetadataCache::new(10, Duration::from_secs(60));
        assert!(cache.get("/media/a.mp4").is_none());

        let inserted = info();
        cache.insert("/media/a.mp4", Arc::clone(&inserted));
        let cached = cache.get("/media/a.mp4").unwrap();
        assert!(Arc::ptr_eq(&cached, &inserted));

        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1,
            }
        );
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let cache = MetadataCache::new(10, Duration::ZERO);
        cache.insert("/media/a.mp4", info());
        assert!(cache.get("/media/a.mp4").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = MetadataCache::new(10, Duration::ZERO);
        cache.insert("a", info());
        cache.insert("b", info());
        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let cache = MetadataCache::new(2, Duration::from_secs(60));
        cache.insert("a", info());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", info());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c", info());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MetadataCache::new(10, Duration::from_secs(60));
        cache.insert("a", info());
        cache.insert("b", info());

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
