// HTTP Server
// Axum router with permissive CORS; the endpoint is consumed directly from
// browser clients on arbitrary origins.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::providers::ClassifierClient;
use crate::services::registry::SourceRegistry;

pub mod analyze;
pub mod error;

pub use error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<ClassifierClient>,
    pub registry: Arc<SourceRegistry>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(ClassifierClient::new()),
            registry: Arc::new(SourceRegistry::default_chain()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/analyze", post(analyze::analyze))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
