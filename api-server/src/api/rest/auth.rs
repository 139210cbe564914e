use super::{parse_body, Ctx, JsonBody};
use crate::auth::guard::AuthUser;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::users;
use crate::error::{ApiError, MessageBody};
use crate::models::user::{PublicUser, User};
use crate::validation::is_valid_email;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::Route;
use serde::{Deserialize, Serialize};

const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthSuccess {
    token: String,
    user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    user: PublicUser,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn issue_session(ctx: Ctx<'_>, user: &User) -> Result<AuthSuccess, ApiError> {
    Ok(AuthSuccess {
        token: ctx.sessions().sign(&user.id, &user.email)?,
        user: user.into(),
    })
}

#[rocket::post("/auth/signup", data = "<body>")]
async fn signup(
    ctx: Ctx<'_>,
    body: JsonBody<'_, SignupRequest>,
) -> Result<Custom<Json<AuthSuccess>>, ApiError> {
    let body = parse_body(body)?;
    let email = non_empty(body.email.map(|email| email.trim().to_lowercase()));
    let username = non_empty(body.username.map(|username| username.trim().to_string()));
    let (Some(email), Some(username), Some(password)) = (email, username, non_empty(body.password))
    else {
        return Err(ApiError::bad_request(
            "email, username, and password are required",
        ));
    };

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("invalid email format"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    if users::find_by_email(ctx.database(), &email)
        .await?
        .is_some() {
        return Err(ApiError::Conflict("email is already registered".into()));
    }

    let password_hash = hash_password_blocking(password).await?;
    let user = users::create(ctx.database(), &email, &username, password_hash)
        .await
        .map_err(|err| {
            if err.is_constraint_violation() {
                ApiError::Conflict("email is already registered".into())
            } else {
                err.into()
            }
        })?;
    log::info!("Registered user {}", user.id);

    Ok(Custom(Status::Created, Json(issue_session(ctx, &user)?)))
}

#[rocket::post("/auth/login", data = "<body>")]
async fn login(ctx: Ctx<'_>, body: JsonBody<'_, LoginRequest>) -> Result<Json<AuthSuccess>, ApiError> {
    let body = parse_body(body)?;
    let email = non_empty(body.email.map(|email| email.trim().to_lowercase()));
    let (Some(email), Some(password)) = (email, non_empty(body.password)) else {
        return Err(ApiError::bad_request("email and password are required"));
    };
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("invalid email format"));
    }

    let invalid = || ApiError::Unauthorized("invalid credentials".into());
    let user = users::find_by_email(ctx.database(), &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password_blocking(password, user.password_hash.clone()).await {
        return Err(invalid());
    }

    Ok(Json(issue_session(ctx, &user)?))
}

#[rocket::get("/auth/me")]
fn me(user: Result<AuthUser, ApiError>) -> Result<Json<MeResponse>, ApiError> {
    let AuthUser(user) = user?;
    Ok(Json(MeResponse {
        user: (&user).into(),
    }))
}

/// Tokens are stateless; logging out is the client dropping its token.
#[rocket::post("/auth/logout")]
fn logout() -> Json<MessageBody> {
    MessageBody::new("logout successful")
}

pub fn routes() -> Vec<Route> {
    rocket::routes![signup, login, me, logout]
}
