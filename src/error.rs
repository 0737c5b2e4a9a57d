//! Error type for the front-end's own routes
//!
//! Every variant leaves the app usable: validation and API failures come
//! back as a message the page can show, a lost session turns into a redirect
//! to the login page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Route the guard and `401` handling send the browser to
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// Extension refused client-side (quota used up or link expired)
    #[error("{0}")]
    ExtensionRejected(String),

    #[error("{0}")]
    NotFound(String),

    /// Login refused by the API
    #[error("{0}")]
    InvalidCredentials(String),

    /// The credential is gone or was refused; it has already been purged
    #[error("session expired")]
    SessionExpired,

    /// The API failed for a reason other than authentication
    #[error("{0}")]
    Upstream(String),

    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::SessionExpired => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExtensionRejected(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidCredentials(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Storage(e) => {
                tracing::error!("storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not access local storage.".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
