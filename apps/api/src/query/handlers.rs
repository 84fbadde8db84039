use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::query::{QuestionRequest, QuestionResponse};
use crate::query::service::process_question;
use crate::state::AppState;

/// POST /ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("Question is required".to_string()));
    }
    let answer = process_question(&state, &req.question).await?;
    Ok(Json(QuestionResponse {
        question: req.question,
        answer,
    }))
}
