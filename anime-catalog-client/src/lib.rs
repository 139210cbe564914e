mod anime;
pub mod cache;
mod catalog_query;
pub mod coalescer;
mod error;
pub mod fetcher;
pub mod filter;
mod jikan;


pub use anime::Anime;
use cache::{CacheKey, CacheStore};
pub use cache::{CacheConfig, CacheStats};
pub use catalog_query::sort::CatalogSort;
pub use catalog_query::CatalogQuery;
use coalescer::RequestCoalescer;
pub use coalescer::CoalescerStats;
pub use error::{Error, ErrorKind, Result};
use fetcher::RetryFetcher;
pub use fetcher::{RetryPolicy, SurfTransport, Transport, UpstreamResponse};
use jikan::{Endpoints, Envelope, JikanAnime};
pub use jikan::JIKAN_BASE_URL;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
pub use utils::Url;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

lazy_static::lazy_static! {
    static ref NUMERIC_ID: Regex = Regex::new(r"^[0-9]+$").expect("numeric id pattern is valid");
}

/// Everything needed to build a [`CatalogClient`].
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: Url,
    /// Results requested per upstream page
    pub page_limit: u32,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: JIKAN_BASE_URL.clone(),
            page_limit: 25,
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Cache and coalescer counters for both namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CatalogCacheStats {
    pub search: CacheStats,
    pub items: CacheStats,
    pub search_requests: CoalescerStats,
    pub item_requests: CoalescerStats,
}

/// Cached, coalesced access to the upstream anime listing.
///
/// Cloning is cheap: clones share the same caches and in-flight requests, so
/// one instance is built at startup and handed to whoever needs it.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: RetryFetcher,
    endpoints: Endpoints,
    config: CatalogConfig,
    search_cache: CacheStore<Vec<Anime>>,
    item_cache: CacheStore<Anime>,
    search_requests: RequestCoalescer<Vec<Anime>>,
    item_requests: RequestCoalescer<Option<Anime>>,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

impl CatalogClient {
    /// Create a client talking to the configured upstream over HTTP
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_transport(config, Arc::new(SurfTransport::new()))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(config: CatalogConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher: RetryFetcher::new(transport, config.retry),
                endpoints: Endpoints::new(config.base_url.clone(), config.page_limit),
                config,
                search_cache: CacheStore::new("search"),
                item_cache: CacheStore::new("item"),
                search_requests: RequestCoalescer::new("search"),
                item_requests: RequestCoalescer::new("item"),
            }),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    /// Search the catalog, serving fresh cached results when available.
    ///
    /// Fails only when the upstream fails and nothing, not even an expired
    /// entry, is cached for this query.
    pub async fn search(&self, query: &CatalogQuery) -> Result<Vec<Anime>> {
        let key = CacheKey::from_query(query);
        if let Some(cached) = self.inner.search_cache.get(&key) {
            log::debug!("Returning cached search result for query: {:?}", query);
            return Ok(cached);
        }

        let inner = Arc::clone(&self.inner);
        let task_query = query.clone();
        let task_key = key.clone();
        let result = self
            .inner
            .search_requests
            .run(key.clone(), async move {
                inner.refresh_search(task_key, task_query).await
            })
            .await;

        match result {
            Err(err) if err.kind() == ErrorKind::Aborted => {
                match self.inner.search_cache.get_stale(&key) {
                    Some(stale) => {
                        log::warn!("Search for {:?} aborted, serving stale result: {}", query, err);
                        Ok(stale)
                    }
                    None => Err(err),
                }
            }
            result => result,
        }
    }

    /// Look up a single anime by its numeric upstream id.
    ///
    /// Never fails: upstream problems degrade to a stale entry or `None`.
    pub async fn get_by_id(&self, id: &str) -> Option<Anime> {
        if !NUMERIC_ID.is_match(id) {
            return None;
        }

        let key = CacheKey::from_id(id);
        if let Some(cached) = self.inner.item_cache.get(&key) {
            return Some(cached);
        }

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let id = id.to_string();
        let result = self
            .inner
            .item_requests
            .run(key.clone(), async move {
                Ok(inner.refresh_item(task_key, &id).await)
            })
            .await;

        match result {
            Ok(found) => found,
            Err(err) => {
                log::warn!("Anime lookup for {:?} aborted: {}", key, err);
                self.inner.item_cache.get_stale(&key)
            }
        }
    }

    pub fn cache_stats(&self) -> CatalogCacheStats {
        CatalogCacheStats {
            search: self.inner.search_cache.stats(),
            items: self.inner.item_cache.stats(),
            search_requests: self.inner.search_requests.stats(),
            item_requests: self.inner.item_requests.stats(),
        }
    }
}

impl Inner {
    async fn refresh_search(&self, key: CacheKey, query: CatalogQuery) -> Result<Vec<Anime>> {
        // An earlier flight may have stored a result after the caller checked.
        if let Some(cached) = self.search_cache.get(&key) {
            return Ok(cached);
        }
        match self.fetch_search(&query).await {
            Ok(items) => {
                self.search_cache
                    .put(key, items.clone(), self.config.cache.search_ttl);
                Ok(items)
            }
            Err(err) => match self.search_cache.get_stale(&key) {
                Some(stale) => {
                    log::warn!(
                        "Using stale catalog cache after fetch failure for query {:?}: {}",
                        query,
                        err
                    );
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }

    async fn fetch_search(&self, query: &CatalogQuery) -> Result<Vec<Anime>> {
        let url = self.endpoints.search(query);
        let payload: Envelope<Vec<JikanAnime>> = self.fetcher.fetch_json(&url).await?;
        let items = payload.data.into_iter().map(Anime::from).collect();
        Ok(filter::apply(items, query))
    }

    async fn refresh_item(&self, key: CacheKey, id: &str) -> Option<Anime> {
        if let Some(cached) = self.item_cache.get(&key) {
            return Some(cached);
        }
        let url = self.endpoints.item(id);
        match self.fetcher.fetch_json::<Envelope<JikanAnime>>(&url).await {
            Ok(payload) => {
                let anime = Anime::from(payload.data);
                self.item_cache
                    .put(key, anime.clone(), self.config.cache.item_ttl);
                Some(anime)
            }
            Err(err) => {
                let stale = self.item_cache.get_stale(&key);
                if stale.is_some() {
                    log::warn!("Using stale anime cache after fetch failure for {}: {}", id, err);
                } else {
                    log::debug!("Anime {} unavailable: {}", id, err);
                }
                stale
            }
        }
    }
}
