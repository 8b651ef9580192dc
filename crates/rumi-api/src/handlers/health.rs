use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;

/// `GET /api/health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
