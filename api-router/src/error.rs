use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_typed_multipart::TypedMultipartError;
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage unavailable")]
    StorageUnavailable(String),

    #[error("Generation failed")]
    GenerationFailed(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::InvalidDocument(msg) => Self::UnsupportedDocument(msg),
            AppError::StorageUnavailable(msg) => {
                tracing::error!(reason = %msg, "Storage unavailable");
                Self::StorageUnavailable("Document storage is unavailable".to_string())
            }
            AppError::Generation(msg) => {
                tracing::warn!(reason = %msg, "Generation failed");
                Self::GenerationFailed("Text generation failed".to_string())
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<TypedMultipartError> for ApiError {
    fn from(err: TypedMultipartError) -> Self {
        if err.get_status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.to_string())
        } else {
            Self::ValidationError(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::UnsupportedDocument(message) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, message),
            Self::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
            Self::StorageUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            Self::GenerationFailed(message) => (StatusCode::BAD_GATEWAY, message),
        };

        let body = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}
