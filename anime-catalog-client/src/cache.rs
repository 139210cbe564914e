use crate::CatalogQuery;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::Instant;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Freshness windows for the two caches.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long search results stay fresh
    pub search_ttl: Duration,
    /// How long single-item lookups stay fresh
    pub item_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl: Duration::from_secs(60),
            item_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// Cached value with its expiry
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
            stored_at: Utc::now(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }

    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }
}

/// Cache key, namespaced so search and item keys never collide
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum CacheKey {
    Search(String), // Hash of canonical query fields
    Item(String),   // Raw upstream id
}

impl CacheKey {
    /// Generate a cache key for a catalog query. Queries that only differ in
    /// surrounding whitespace or genre casing map to the same key.
    pub fn from_query(query: &CatalogQuery) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"q=");
        hasher.update(query.search_text().unwrap_or_default().as_bytes());
        hasher.update(b"\0genre=");
        hasher.update(query.genre_filter().unwrap_or_default().as_bytes());
        hasher.update(b"\0minRating=");
        if let Some(min_rating) = query.min_rating() {
            hasher.update(min_rating.to_string().as_bytes());
        }
        hasher.update(b"\0maxEpisodes=");
        if let Some(max_episodes) = query.max_episodes() {
            hasher.update(max_episodes.to_string().as_bytes());
        }
        hasher.update(b"\0sort=");
        hasher.update(query.sort().as_ref().as_bytes());

        CacheKey::Search(hex::encode(hasher.finalize()))
    }

    pub fn from_id(id: &str) -> Self {
        CacheKey::Item(id.to_string())
    }
}

/// In-memory TTL store. Expired entries are kept around so they can be
/// served as a fallback; a successful refresh overwrites them.
pub struct CacheStore<V> {
    name: &'static str,
    entries: DashMap<CacheKey, CacheEntry<V>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    /// Get the cached value if present and still fresh
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh() => {
                log::debug!("{} cache hit for key: {:?}", self.name, key);
                Some(entry.value.clone())
            }
            Some(_) => {
                log::debug!("{} cache expired for key: {:?}", self.name, key);
                None
            }
            None => {
                log::debug!("{} cache miss for key: {:?}", self.name, key);
                None
            }
        }
    }

    /// Get the cached value ignoring expiry
    pub fn get_stale(&self, key: &CacheKey) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store or overwrite the value for `key`
    pub fn put(&self, key: CacheKey, value: V, ttl: Duration) {
        log::debug!("Stored in {} cache with key: {:?}", self.name, key);
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut total_entries = 0;
        let mut fresh_entries = 0;
        let mut last_stored_at = None;
        for entry in self.entries.iter() {
            total_entries += 1;
            if entry.is_fresh() {
                fresh_entries += 1;
            }
            last_stored_at = last_stored_at.max(Some(entry.stored_at()));
        }

        CacheStats {
            name: self.name.to_string(),
            total_entries,
            fresh_entries,
            stale_entries: total_entries - fresh_entries,
            last_stored_at,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub name: String,
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
    /// When the most recent entry was written
    pub last_stored_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogSort;

    #[test]
    fn test_cache_key_generation() {
        let query = CatalogQuery::new()
            .with_text("frieren")
            .with_genre("Adventure")
            .with_min_rating(8.0);

        let key1 = CacheKey::from_query(&query);
        let key2 = CacheKey::from_query(&query.clone());
        assert_eq!(key1, key2);

        let other = query.clone().with_sort(CatalogSort::TitleAsc);
        assert_ne!(key1, CacheKey::from_query(&other));
    }

    #[test]
    fn equivalent_queries_share_a_key() {
        let a = CatalogQuery::new()
            .with_max_episodes(25)
            .with_genre(" action")
            .with_text("titan ");
        let b = CatalogQuery::new()
            .with_text("titan")
            .with_genre("Action")
            .with_max_episodes(25);
        assert_eq!(CacheKey::from_query(&a), CacheKey::from_query(&b));
    }

    #[test]
    fn absent_and_blank_text_share_a_key() {
        assert_eq!(
            CacheKey::from_query(&CatalogQuery::new()),
            CacheKey::from_query(&CatalogQuery::new().with_text("  "))
        );
    }

    #[test]
    fn search_and_item_namespaces_differ() {
        assert_ne!(CacheKey::Search("1".into()), CacheKey::from_id("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_kept_for_stale_reads() {
        let store = CacheStore::new("search");
        let key = CacheKey::from_id("1");
        store.put(key.clone(), 42, Duration::from_secs(60));
        assert_eq!(store.get(&key), Some(42));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(store.get(&key), None);
        assert_eq!(store.get_stale(&key), Some(42));
        assert_eq!(store.len(), 1);

        let stats = store.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.stale_entries, 1);
        assert!(stats.last_stored_at.is_some());
    }

    #[test]
    fn empty_store_has_no_last_write() {
        let store = CacheStore::<u32>::new("item");
        let stats = store.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.last_stored_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_and_extends_expiry() {
        let store = CacheStore::new("item");
        let key = CacheKey::from_id("7");
        store.put(key.clone(), "old", Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(11)).await;
        store.put(key.clone(), "new", Duration::from_secs(10));
        assert_eq!(store.get(&key), Some("new"));
        assert_eq!(store.stats().fresh_entries, 1);
    }
}
