// handlers/health.rs - GET /health liveness probe

use axum::response::Json;
use serde_json::{json, Value};

/// GET /health - liveness check, excluded from the access gate
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}
