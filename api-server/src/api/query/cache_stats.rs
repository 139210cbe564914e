use super::super::get_context;
use anime_catalog_client::CatalogCacheStats;
use async_graphql::{Context, Object};

#[derive(Default)]
pub struct CacheStatsQuery;

#[Object]
impl CacheStatsQuery {
    /// Current state of the catalog caches and in-flight requests
    async fn cache_stats<'ctx>(&self, context: &Context<'ctx>) -> CatalogCacheStats {
        let ctx = get_context(context);
        ctx.catalog_client().cache_stats()
    }
}
