use crate::{
    config::Config,
    docs::ApiDoc,
    handlers::{
        health_check, management_audits, management_configprops, management_env, management_health,
        management_logs, management_metrics, TOTAL_COUNT_HEADER,
    },
    routes::auth_middleware::auth_middleware,
    websocket::tracker_handler,
    ws::hubctx::HubState,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Unauthenticated API routes
pub fn create_api_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Management routes, guarded by the admin auth middleware
pub fn create_management_routes(hub: Arc<HubState>) -> Router {
    Router::<Arc<HubState>>::new()
        .route("/health", get(management_health))
        .route("/metrics", get(management_metrics))
        .route("/logs", get(management_logs))
        .route("/env", get(management_env))
        .route("/configprops", get(management_configprops))
        .route("/audits", get(management_audits))
        .route_layer(middleware::from_fn(auth_middleware)) // Applies to all routes added above
        .with_state(hub)
}

/// The tracker web socket endpoint
pub fn create_tracker_routes(hub: Arc<HubState>) -> Router {
    Router::<Arc<HubState>>::new()
        .route("/websocket/tracker", get(tracker_handler))
        .with_state(hub)
}

fn cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .expose_headers([HeaderName::from_static(TOTAL_COUNT_HEADER)])
        }
        None if config.is_development() => CorsLayer::permissive(),
        None => CorsLayer::new(),
    }
}

/// The whole hub application
pub fn create_app_routes(hub: Arc<HubState>, config: &Config) -> Router {
    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes())
        .nest("/management", create_management_routes(hub.clone()))
        .merge(create_tracker_routes(hub))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(config))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}
