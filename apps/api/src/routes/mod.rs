pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::cv::handlers as cv;
use crate::errors::AppError;
use crate::query::handlers as query;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion
        .route("/upload", post(cv::handle_upload))
        .route("/cv", get(cv::handle_list_cvs))
        // Question answering
        .route("/ask", post(query::handle_ask))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
