use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Hub health
#[utoipa::path(
    get,
    path = "/management/health",
    responses(
        (status = 200, description = "Hub is up", body = ManagementHealth),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not an admin")
    )
)]
#[allow(dead_code)]
pub async fn management_health_doc() {}

/// Process and hub metrics
#[utoipa::path(
    get,
    path = "/management/metrics",
    responses(
        (status = 200, description = "Current metrics", body = MetricsResponse)
    )
)]
#[allow(dead_code)]
pub async fn management_metrics_doc() {}

/// Configured loggers
#[utoipa::path(
    get,
    path = "/management/logs",
    responses(
        (status = 200, description = "Loggers and their levels", body = [Logger])
    )
)]
#[allow(dead_code)]
pub async fn management_logs_doc() {}

/// Environment
#[utoipa::path(
    get,
    path = "/management/env",
    responses(
        (status = 200, description = "Active profiles and properties", body = EnvResponse)
    )
)]
#[allow(dead_code)]
pub async fn management_env_doc() {}

/// Redacted configuration
#[utoipa::path(
    get,
    path = "/management/configprops",
    responses(
        (status = 200, description = "Running configuration", body = Object),
        (status = 500, description = "Serialization failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn management_configprops_doc() {}

/// Audit trail
#[utoipa::path(
    get,
    path = "/management/audits",
    params(
        ("page" = Option<usize>, Query, description = "Zero based page"),
        ("size" = Option<usize>, Query, description = "Page size, 20 by default")
    ),
    responses(
        (status = 200, description = "Audit events, newest first", body = [AuditEvent],
            headers(("X-Total-Count" = u64, description = "Number of retained events"))),
        (status = 400, description = "Invalid page size", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn management_audits_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        management_health_doc,
        management_metrics_doc,
        management_logs_doc,
        management_env_doc,
        management_configprops_doc,
        management_audits_doc,
    ),
    components(
        schemas(
            HealthResponse, ErrorResponse, ManagementHealth, HealthDetails, TrackerConnection, MetricsResponse,
            Logger, EnvResponse, PropertySource, AuditEvent, ActivityEvent
        )
    ),
    tags(
        (name = "api", description = "API endpoints"),
        (name = "management", description = "Hub management endpoints")
    )
)]
pub struct ApiDoc;
