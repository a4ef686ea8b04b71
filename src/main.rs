use std::panic;
use std::sync::Arc;

use roomsync::{AppState, config::Config, routes::create_app};
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first so LOG_LEVEL can shape the default filter
    let config_result = Config::load();
    let log_level = config_result
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| Config::default().log_level);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // LOG_LEVEL applies to our crate; RUST_LOG overrides everything
            format!("roomsync={log_level},tower_http=debug,axum::rejection=trace,info").into()
        }))
        .init();

    info!("Starting server...");

    let config = config_result.unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    info!("Initial sync policy: {:?}", config.sync_policy);
    if config.is_development() {
        warn!("Running in {} mode, CORS origins: {:?}", config.environment, config.allowed_origins());
    }

    // Spawn the room registry and build the router around it
    let app_state = Arc::new(AppState::from_config(&config));
    let app_routes = create_app(app_state, &config);

    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
