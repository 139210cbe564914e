use super::{Ctx, Items};
use crate::error::ApiError;
use crate::validation::{catalog_query, CatalogParams};
use anime_catalog_client::Anime;
use rocket::serde::json::Json;
use rocket::{FromForm, Route};

#[derive(Debug, Default, FromForm)]
pub struct CatalogForm<'r> {
    q: Option<&'r str>,
    genre: Option<&'r str>,
    #[field(name = "minRating")]
    min_rating: Option<&'r str>,
    #[field(name = "maxEpisodes")]
    max_episodes: Option<&'r str>,
    sort: Option<&'r str>,
}

impl<'r> From<&CatalogForm<'r>> for CatalogParams<'r> {
    fn from(form: &CatalogForm<'r>) -> Self {
        CatalogParams {
            q: form.q,
            genre: form.genre,
            min_rating: form.min_rating,
            max_episodes: form.max_episodes,
            sort: form.sort,
        }
    }
}

#[rocket::get("/catalog?<params..>")]
async fn search(ctx: Ctx<'_>, params: CatalogForm<'_>) -> Result<Json<Items<Anime>>, ApiError> {
    let query = catalog_query(CatalogParams::from(&params))?;
    let items = ctx.catalog_client().search(&query).await?;
    Ok(Json(items.into()))
}

#[rocket::get("/catalog/<id>")]
async fn get_by_id(ctx: Ctx<'_>, id: &str) -> Result<Json<Anime>, ApiError> {
    ctx.catalog_client()
        .get_by_id(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("anime not found"))
}

pub fn routes() -> Vec<Route> {
    rocket::routes![search, get_by_id]
}
