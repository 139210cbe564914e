use crate::auth::password::PasswordError;
use crate::auth::users::SeedError;
use crate::db::DbError;
use crate::models::config::ConfigError;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("catalog upstream unavailable: {0}")]
    Upstream(#[from] anime_catalog_client::Error),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Upstream(_) => Status::BadGateway,
            ApiError::Database(_)
            | ApiError::Password(_)
            | ApiError::Token(_)
            | ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = match &self {
            ApiError::Upstream(err) => {
                log::warn!("{} {}: {}", req.method(), req.uri(), err);
                "Catalog service is unavailable, try again later".to_string()
            }
            ApiError::Database(_)
            | ApiError::Password(_)
            | ApiError::Token(_)
            | ApiError::Internal(_) => {
                log::error!("Unhandled error on {} {}: {}", req.method(), req.uri(), self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, MessageBody::new(message)).respond_to(req)
    }
}

/// Anything that stops the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] DbError),
    #[error("seeding: {0}")]
    Seed(#[from] SeedError),
}
