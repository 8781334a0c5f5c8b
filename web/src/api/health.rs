//! Health check endpoint.

use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

/// Liveness probe; answers as long as the process is up.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}
