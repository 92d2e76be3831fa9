use crate::db;
use crate::extract::Json;
use crate::AppState;
use axum::{extract::Extension, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn status_routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/status", get(api_status))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "HopeLine API" }))
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = if db::ping(&state.db_pool).await {
        "healthy"
    } else {
        "unhealthy"
    };
    let gemini_status = match &state.gemini_client {
        Some(_) => "configured",
        None => "not_configured",
    };

    Json(json!({
        "status": "operational",
        "service": "HopeLine API",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "gemini": gemini_status,
        },
        "assessmentStore": {
            "entries": state.assessment_store.len(),
        },
    }))
}
