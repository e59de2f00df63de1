use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn reply(code: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (
            code,
            Json(ErrorResponse {
                code: code.as_u16(),
                status: code.canonical_reason().unwrap_or("error").to_string(),
                error: error.into(),
            }),
        )
    }
}
