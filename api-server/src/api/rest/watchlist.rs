use super::{parse_body, Ctx, Items, JsonBody};
use crate::auth::guard::AuthUser;
use crate::error::ApiError;
use crate::models::watchlist::{AnimeStatus, WatchlistEntry, WatchlistUpdate};
use crate::validation::{clean_notes, is_valid_rating, parse_status};
use crate::watchlist::store;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::Route;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    anime_id: Option<String>,
    status: Option<String>,
}

/// Every field keeps the raw JSON value so `null` can be told apart from
/// an absent field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    #[serde(default, deserialize_with = "present")]
    status: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    rating: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    notes: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    progress_episodes: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<UpdateEntryRequest> for WatchlistUpdate {
    type Error = ApiError;

    fn try_from(request: UpdateEntryRequest) -> Result<Self, Self::Error> {
        let mut update = WatchlistUpdate::default();

        if let Some(status) = request.status {
            let status = status
                .as_str()
                .ok_or_else(|| ApiError::bad_request("invalid status value"))?;
            update.status = Some(parse_status(status)?);
        }

        if let Some(rating) = request.rating {
            update.rating = match rating {
                Value::Null => Some(None),
                value => {
                    let rating = value
                        .as_f64()
                        .filter(|rating| is_valid_rating(*rating))
                        .ok_or_else(|| ApiError::bad_request("rating must be between 0 and 10"))?;
                    Some(Some(rating))
                }
            };
        }

        if let Some(notes) = request.notes {
            let notes = notes
                .as_str()
                .ok_or_else(|| ApiError::bad_request("notes must be a string"))?;
            update.notes = Some(clean_notes(notes));
        }

        if let Some(progress) = request.progress_episodes {
            let progress = progress
                .as_u64()
                .and_then(|progress| u32::try_from(progress).ok())
                .ok_or_else(|| {
                    ApiError::bad_request("progressEpisodes must be a non-negative integer")
                })?;
            update.progress_episodes = Some(progress);
        }

        Ok(update)
    }
}

fn entry_not_found() -> ApiError {
    ApiError::not_found("watchlist item not found")
}

#[rocket::get("/watchlist")]
async fn list(
    ctx: Ctx<'_>,
    user: Result<AuthUser, ApiError>,
) -> Result<Json<Items<WatchlistEntry>>, ApiError> {
    let AuthUser(user) = user?;
    Ok(Json(store::list(ctx.database(), &user.id).await?.into()))
}

#[rocket::post("/watchlist", data = "<body>")]
async fn add(
    ctx: Ctx<'_>,
    user: Result<AuthUser, ApiError>,
    body: JsonBody<'_, CreateEntryRequest>,
) -> Result<Custom<Json<WatchlistEntry>>, ApiError> {
    let AuthUser(user) = user?;
    let body = parse_body(body)?;

    let anime_id = body
        .anime_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("animeId is required"))?;
    let status = match body.status.as_deref() {
        Some(status) => parse_status(status)?,
        None => AnimeStatus::default(),
    };

    let anime = ctx
        .catalog_client()
        .get_by_id(anime_id)
        .await
        .ok_or_else(|| ApiError::not_found("anime not found in catalog"))?;

    let duplicate = || ApiError::Conflict("anime already in watchlist".into());
    if store::get(ctx.database(), &user.id, anime_id)
        .await?
        .is_some() {
        return Err(duplicate());
    }
    let entry = store::add(ctx.database(), &user.id, &anime, status)
        .await
        .map_err(|err| {
            if err.is_constraint_violation() {
                duplicate()
            } else {
                err.into()
            }
        })?;

    Ok(Custom(Status::Created, Json(entry)))
}

#[rocket::patch("/watchlist/<anime_id>", data = "<body>")]
async fn update(
    ctx: Ctx<'_>,
    user: Result<AuthUser, ApiError>,
    anime_id: &str,
    body: JsonBody<'_, UpdateEntryRequest>,
) -> Result<Json<WatchlistEntry>, ApiError> {
    let AuthUser(user) = user?;
    if store::get(ctx.database(), &user.id, anime_id)
        .await?
        .is_none() {
        return Err(entry_not_found());
    }

    let update = WatchlistUpdate::try_from(parse_body(body)?)?;
    store::update(ctx.database(), &user.id, anime_id, update)
        .await?
        .map(Json)
        .ok_or_else(entry_not_found)
}

#[rocket::delete("/watchlist/<anime_id>")]
async fn remove(
    ctx: Ctx<'_>,
    user: Result<AuthUser, ApiError>,
    anime_id: &str,
) -> Result<Status, ApiError> {
    let AuthUser(user) = user?;
    if store::remove(ctx.database(), &user.id, anime_id).await? {
        Ok(Status::NoContent)
    } else {
        Err(entry_not_found())
    }
}

pub fn routes() -> Vec<Route> {
    rocket::routes![list, add, update, remove]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<WatchlistUpdate, ApiError> {
        let request: UpdateEntryRequest = serde_json::from_value(body).unwrap();
        WatchlistUpdate::try_from(request)
    }

    #[test]
    fn absent_and_null_rating_differ() {
        assert_eq!(parse(json!({})).unwrap(), WatchlistUpdate::default());
        assert_eq!(parse(json!({ "rating": null })).unwrap().rating, Some(None));
        assert_eq!(parse(json!({ "rating": 7.5 })).unwrap().rating, Some(Some(7.5)));
    }

    #[test]
    fn invalid_fields_are_rejected() {
        for body in [
            json!({ "rating": 11 }),
            json!({ "rating": "high" }),
            json!({ "status": "paused" }),
            json!({ "status": 3 }),
            json!({ "notes": 5 }),
            json!({ "progressEpisodes": -1 }),
            json!({ "progressEpisodes": 1.5 }),
        ] {
            assert!(
                matches!(parse(body.clone()), Err(ApiError::BadRequest(_))),
                "{}",
                body
            );
        }
    }

    #[test]
    fn notes_and_progress_are_normalized() {
        let update = parse(json!({
            "status": "completed",
            "notes": "  rewatch soon ",
            "progressEpisodes": 24
        }))
        .unwrap();
        assert_eq!(update.status, Some(AnimeStatus::Completed));
        assert_eq!(update.notes.as_deref(), Some("rewatch soon"));
        assert_eq!(update.progress_episodes, Some(24));
    }
}
