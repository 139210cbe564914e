use super::super::get_context;
use crate::validation::is_valid_rating;
use anime_catalog_client::{Anime, CatalogQuery, CatalogSort};
use async_graphql::{Context, Object, Result};

#[derive(Default)]
pub struct CatalogGraphQuery;

#[Object]
impl CatalogGraphQuery {
    /// Search the anime catalog
    async fn catalog<'ctx>(
        &self,
        context: &Context<'ctx>,
        query: Option<String>,
        genre: Option<String>,
        min_rating: Option<f64>,
        max_episodes: Option<u32>,
        sort: Option<CatalogSort>,
    ) -> Result<Vec<Anime>> {
        let ctx = get_context(context);

        let mut catalog_query = CatalogQuery::new().with_sort(sort.unwrap_or_default());
        if let Some(text) = query {
            catalog_query = catalog_query.with_text(text);
        }
        if let Some(genre) = genre {
            catalog_query = catalog_query.with_genre(genre);
        }
        if let Some(min_rating) = min_rating {
            if !is_valid_rating(min_rating) {
                return Err("minRating must be a number between 0 and 10".into());
            }
            catalog_query = catalog_query.with_min_rating(min_rating);
        }
        if let Some(max_episodes) = max_episodes {
            if max_episodes == 0 {
                return Err("maxEpisodes must be a positive integer".into());
            }
            catalog_query = catalog_query.with_max_episodes(max_episodes);
        }

        Ok(ctx.catalog_client().search(&catalog_query).await?)
    }

    /// Look up one anime by id
    async fn anime<'ctx>(&self, context: &Context<'ctx>, id: String) -> Option<Anime> {
        let ctx = get_context(context);
        ctx.catalog_client().get_by_id(&id).await
    }
}
