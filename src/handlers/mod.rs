pub mod health;
pub mod index;
pub mod summarize;

pub use health::*;
pub use index::*;
pub use summarize::*;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::middleware::logging_middleware;
use crate::services::ModelCache;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: Arc<ModelCache>,
}

impl AppState {
    pub fn new(config: Config, models: ModelCache) -> Self {
        Self {
            config: Arc::new(config),
            models: Arc::new(models),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // multipart framing needs some headroom over the file itself
    let body_limit = state.config.max_file_size_bytes() + 64 * 1024;

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/api/v1/summarize", post(summarize_handler))
        .route("/api/v1/summarize/binary", post(summarize_binary_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(axum::middleware::from_fn(logging_middleware)),
        )
        .with_state(state)
}
