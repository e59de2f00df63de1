use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness response served on `/api/health`
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub message: String,
}
