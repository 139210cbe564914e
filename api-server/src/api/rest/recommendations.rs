use super::Ctx;
use crate::auth::guard::AuthUser;
use crate::error::ApiError;
use crate::recommendations::{self, RecommendationResponse};
use crate::watchlist::store;
use anime_catalog_client::CatalogQuery;
use rocket::serde::json::Json;
use rocket::Route;

#[rocket::get("/recommendations/personalized")]
async fn personalized(
    ctx: Ctx<'_>,
    user: Result<AuthUser, ApiError>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let AuthUser(user) = user?;
    let watchlist = store::list(ctx.database(), &user.id).await?;
    let candidates = ctx.catalog_client().search(&CatalogQuery::default()).await?;
    Ok(Json(recommendations::personalized(&watchlist, &candidates)))
}

#[rocket::get("/recommendations/preview")]
async fn preview(ctx: Ctx<'_>) -> Result<Json<RecommendationResponse>, ApiError> {
    let top = ctx.catalog_client().search(&CatalogQuery::default()).await?;
    Ok(Json(recommendations::preview(&top)))
}

pub fn routes() -> Vec<Route> {
    rocket::routes![personalized, preview]
}
