use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::identity::IdentityError;
use crate::remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Remote(e) => {
                tracing::error!("Remote error: {}", e);
                (StatusCode::BAD_GATEWAY, "Backend unavailable".to_string())
            }
            AppError::Identity(e) => {
                tracing::warn!("Identity error: {}", e);
                (StatusCode::UNAUTHORIZED, "Sign-in failed".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
