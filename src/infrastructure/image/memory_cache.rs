//! In-memory LRU thumbnail cache.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::Thumbnail;

/// Default maximum number of thumbnails kept in memory.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// Default budget for decoded pixel data (64 MiB).
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

struct Inner {
    entries: LruCache<String, Thumbnail>,
    total_bytes: usize,
}

/// Bounded cache of decoded thumbnails keyed by URL.
///
/// Evicts least recently used entries when either the entry count or the
/// decoded byte budget is exceeded. Thread-safe; callers need no locking.
/// Entries may vanish at any time and must never be assumed present.
pub struct ThumbnailCache {
    inner: Mutex<Inner>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn cost(image: &Thumbnail) -> usize {
    image.as_bytes().len()
}

impl ThumbnailCache {
    /// Creates a cache with the given limits. A zero entry limit is raised to one.
    #[must_use]
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                total_bytes: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a thumbnail and marks it recently used.
    pub fn get(&self, url: &str) -> Option<Thumbnail> {
        let mut inner = self.inner.lock();
        if let Some(image) = inner.entries.get(url) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url, "Thumbnail cache hit");
            Some(image.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(url, "Thumbnail cache miss");
            None
        }
    }

    /// Checks for an entry without touching recency or statistics.
    pub fn contains(&self, url: &str) -> bool {
        self.inner.lock().entries.contains(url)
    }

    /// Stores a thumbnail, evicting older entries as needed.
    pub fn insert(&self, url: impl Into<String>, image: Thumbnail) {
        let url = url.into();
        let added = cost(&image);
        let mut inner = self.inner.lock();

        inner.total_bytes += added;
        if let Some((_, replaced)) = inner.entries.push(url.clone(), image) {
            inner.total_bytes = inner.total_bytes.saturating_sub(cost(&replaced));
        }

        while inner.total_bytes > self.max_bytes && inner.entries.len() > 1 {
            let Some((evicted_url, evicted)) = inner.entries.pop_lru() else {
                break;
            };
            inner.total_bytes = inner.total_bytes.saturating_sub(cost(&evicted));
            debug!(url = %evicted_url, "Evicted thumbnail over byte budget");
        }
        trace!(url = %url, bytes = added, "Stored thumbnail");
    }

    /// Removes a single entry.
    pub fn evict(&self, url: &str) {
        let mut inner = self.inner.lock();
        if let Some(image) = inner.entries.pop(url) {
            inner.total_bytes = inner.total_bytes.saturating_sub(cost(&image));
            debug!(url, "Evicted thumbnail");
        }
    }

    /// Drops every entry, as under memory pressure.
    pub fn purge(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_bytes = 0;
        debug!("Purged thumbnail cache");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decoded bytes currently held.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let inner = self.inner.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: inner.entries.len(),
            bytes: inner.total_bytes,
        }
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_BYTES)
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached thumbnails.
    pub size: usize,
    /// Decoded bytes held.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} thumbnails ({} KiB), {:.1}% hit rate ({} hits, {} misses)",
            self.size,
            self.bytes / 1024,
            self.hit_rate,
            self.hits,
            self.misses
        )
    }
}
