mod admin;
mod clients;
mod config;
mod console;
mod docs;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod stomp;
mod tracker;
mod websocket;
mod ws;

use std::net::SocketAddr;
use std::panic;
use std::sync::Arc;
use config::Config;
use routes::create_app_routes;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ws::hubctx::HubState;

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "activity_tracker=debug,tower_http=debug,info".into()
        }))
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    let config = config::init_config(config);

    if config.is_console() {
        info!("Starting tracker console against {}", config.tracker_origin);
        if let Err(e) = console::run(config).await {
            error!("Console stopped: {}", e);
            std::process::exit(1);
        }
        return;
    }

    info!("Starting tracker hub...");
    if config.auth_jwt_secret.is_none() {
        warn!("No JWT secret configured - tracker clients are anonymous and management is open");
    }
    ws::principal::init_principal_cache();

    let hub = Arc::new(HubState::new(config.audit_capacity));
    let app_routes = create_app_routes(hub, config);

    // Start the HTTP/WebSocket server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 Tracker available at ws://{}/websocket/tracker", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app_routes.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server failed to start");
}
