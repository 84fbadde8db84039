use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and AI provider.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.config.project_name,
        "version": env!("CARGO_PKG_VERSION"),
        "ai_provider": state.ai.name(),
    }))
}
