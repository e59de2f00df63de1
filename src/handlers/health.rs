use axum::Json;
use crate::config;
use crate::models::HealthResponse;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        service: config::get_config().service_name.clone(),
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}
