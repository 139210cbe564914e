pub mod auth;
pub mod catalog;
pub mod health;
pub mod recommendations;
pub mod watchlist;

use crate::error::ApiError;
use crate::models::context::ContextPointer;
use rocket::serde::json::{self, Json};
use rocket::{Route, State};
use serde::Serialize;

pub type Ctx<'r> = &'r State<ContextPointer>;

/// A JSON request body whose parse failure the handler reports itself.
pub type JsonBody<'r, T> = Result<Json<T>, json::Error<'r>>;

pub fn parse_body<T>(body: JsonBody<'_, T>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|err| {
        log::debug!("Rejected request body: {}", err);
        ApiError::bad_request("request body must be valid JSON")
    })
}

/// `{ "items": [...] }`
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

pub fn routes() -> Vec<Route> {
    let mut routes = rocket::routes![health::health];
    routes.extend(auth::routes());
    routes.extend(catalog::routes());
    routes.extend(watchlist::routes());
    routes.extend(recommendations::routes());
    routes
}
