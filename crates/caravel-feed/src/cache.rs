//! In-memory response cache keyed by feed URL + package identity.

use caravel_core::Version;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

/// Cache statistics.
#[derive(Debug, Default)]
pub struct FeedCacheStats {
    /// Lookup hits.
    pub hits: AtomicU64,
    /// Lookup misses.
    pub misses: AtomicU64,
}

impl FeedCacheStats {
    /// Hit rate in percent.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// Per-run cache of feed version listings.
///
/// A `None` value records a definitive "feed does not know this name"
/// answer so repeated probes stay off the network.
#[derive(Debug, Default)]
pub struct FeedCache {
    listings: DashMap<(String, String), Option<Arc<Vec<Version>>>>,
    stats: FeedCacheStats,
}

impl FeedCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache statistics.
    #[must_use]
    pub const fn stats(&self) -> &FeedCacheStats {
        &self.stats
    }

    /// Look up a cached listing.
    #[must_use]
    pub fn get(&self, feed: &Url, name: &str) -> Option<Option<Arc<Vec<Version>>>> {
        let key = (feed.as_str().to_string(), name.to_string());
        match self.listings.get(&key) {
            Some(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Record a listing (or a definitive not-found).
    pub fn put(&self, feed: &Url, name: &str, versions: Option<Arc<Vec<Version>>>) {
        let key = (feed.as_str().to_string(), name.to_string());
        self.listings.insert(key, versions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss_accounting() {
        let cache = FeedCache::new();
        let feed = Url::parse("https://feed.example/").unwrap();

        assert!(cache.get(&feed, "A").is_none());
        cache.put(
            &feed,
            "A",
            Some(Arc::new(vec![Version::parse("1.0").unwrap()])),
        );
        let cached = cache.get(&feed, "A").unwrap().unwrap();
        assert_eq!(cached.len(), 1);
        assert!((cache.stats().hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_answers_are_cached() {
        let cache = FeedCache::new();
        let feed = Url::parse("https://feed.example/").unwrap();
        cache.put(&feed, "Missing", None);
        assert_eq!(cache.get(&feed, "Missing"), Some(None));
    }

    #[test]
    fn distinct_feeds_do_not_collide() {
        let cache = FeedCache::new();
        let feed_a = Url::parse("https://a.example/").unwrap();
        let feed_b = Url::parse("https://b.example/").unwrap();
        cache.put(&feed_a, "A", None);
        assert!(cache.get(&feed_b, "A").is_none());
    }
}
