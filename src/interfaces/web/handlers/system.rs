use axum::{Json, http::StatusCode};

pub async fn health_endpoint() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "healthy" })))
}
