use super::users;
use crate::error::ApiError;
use crate::models::context::ContextPointer;
use crate::models::user::User;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

/// The account behind a valid `Authorization: Bearer <token>` header.
///
/// Handlers take `Result<AuthUser, ApiError>` so the specific rejection
/// reason reaches the client.
pub struct AuthUser(pub User);

fn reject(error: ApiError) -> Outcome<AuthUser, ApiError> {
    Outcome::Error((error.status(), error))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(ctx) = req.rocket().state::<ContextPointer>() else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("context is not managed".into()),
            ));
        };

        let token = match req
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
        {
            Some(token) => token.trim(),
            None => return reject(ApiError::Unauthorized("Missing bearer token".into())),
        };

        let Some(claims) = ctx.sessions().verify(token) else {
            return reject(ApiError::Unauthorized("Invalid or expired token".into()));
        };

        match users::find_by_id(ctx.database(), &claims.sub).await {
            Ok(Some(user)) => Outcome::Success(AuthUser(user)),
            Ok(None) => reject(ApiError::Unauthorized("Session user not found".into())),
            Err(err) => reject(err.into()),
        }
    }
}
