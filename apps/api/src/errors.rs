use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai_client::AiError;
use crate::archive::ArchiveError;
use crate::cv::pdf::PdfError;
use crate::vector_db::VectorDbError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("CV processing error: {0}")]
    CvProcessing(String),

    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("S3 error: {0}")]
    S3(#[from] ArchiveError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PdfError> for AppError {
    fn from(e: PdfError) -> Self {
        AppError::CvProcessing(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::CvProcessing(msg) => {
                tracing::error!("CV processing error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "CV_PROCESSING_ERROR",
                    msg.clone(),
                )
            }
            AppError::Ai(e) => {
                tracing::error!("AI service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AI_SERVICE_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::VectorDb(e) => {
                tracing::error!("Vector database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "VECTOR_DB_ERROR",
                    "A vector database error occurred".to_string(),
                )
            }
            AppError::S3(e) => {
                tracing::error!("S3 error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "S3_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
