pub mod cache_stats;
pub mod catalog;

use async_graphql::MergedObject;
use cache_stats::CacheStatsQuery;
use catalog::CatalogGraphQuery;

#[derive(MergedObject, Default)]
pub struct QueryRoot(CatalogGraphQuery, CacheStatsQuery);
