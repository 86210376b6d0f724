use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppResult;
use crate::handlers::AppState;

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let model_loaded = state.models.is_loaded();

    let response = json!({
        "status": "healthy",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "model": {
            "id": state.models.model_id(),
            "loaded": model_loaded
        },
        "chunking": {
            "max_words": state.config.chunk_max_words,
            "min_words": state.config.chunk_min_words
        }
    });

    info!(model_loaded = model_loaded, "Health check completed");

    Ok(Json(response))
}

/// Readiness check endpoint. The model loads lazily, so readiness does not
/// wait for it.
pub async fn ready_handler() -> StatusCode {
    StatusCode::OK
}
