use axum::Json;
use serde_json::{json, Value};

/// Liveness endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}
