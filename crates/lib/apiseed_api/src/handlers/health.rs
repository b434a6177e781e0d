//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health`: reports that the server is up and its version.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: apiseed_core::version().to_string(),
    })
}
