// API Error Handling
// Client mistakes map to 4xx with a stable {error, details} body; everything
// else collapses to a generic 500 so internal failure detail never leaks.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no image data provided")]
    MissingImage,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Json extractor whose rejection carries the {error, details} body instead
/// of axum's plain-text default.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::InvalidBody(rejection.body_text())),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::MissingImage => (
                StatusCode::BAD_REQUEST,
                "Invalid request",
                "imageBase64 is required".to_string(),
            ),
            AppError::InvalidBody(detail) => (
                StatusCode::BAD_REQUEST,
                "Invalid request",
                detail.clone(),
            ),
            AppError::Internal(detail) => {
                error!("[SERVER] internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Analysis failed",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });
        (status, body).into_response()
    }
}
