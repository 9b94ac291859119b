//! Subscription coordinator HTTP entrypoint.
//!
//! This binary launches an Axum-based HTTP server that coordinates delegated
//! session keys and recurring-subscription state for ERC-6900 modular smart
//! accounts.
//!
//! Endpoints:
//! - `POST /subscription/create-session` – Issue (or reuse) a delegated key
//! - `POST /subscription/install-data` – Build the module install payload
//! - `POST /subscription/confirm-install` – Record on-chain installation
//! - `POST /subscription/check` – Read billing flags
//! - `POST /subscription/pause` – Pause or resume billing
//! - `POST /subscription/cancel` – Cancel and revoke
//! - `POST /subscription/session-key` – Public session-key info
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control binding address
//! - `CONFIG_FILE` points at the TOML policy/config file
//! - `RUST_LOG` controls log filtering

use axum::http::Method;
use axum::Router;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors;
use tracing_subscriber::EnvFilter;

use crate::config::CoordinatorConfig;
use crate::coordinator_local::CoordinatorLocal;
use crate::store::json_file::JsonFileStore;

mod config;
mod coordinator;
mod coordinator_local;
mod handlers;
mod install_payload;
mod registry;
mod store;
mod types;

/// Initializes the subscription coordinator server.
///
/// - Loads `.env` variables.
/// - Initializes tracing.
/// - Opens the JSON record store.
/// - Starts an Axum HTTP server with the coordinator handlers.
///
/// Binds to the address specified by the `HOST` and `PORT` env vars.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let app_config = match CoordinatorConfig::from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            tracing::info!("Using default configuration");
            CoordinatorConfig::default()
        }
    };

    // Abort if the record store can't be opened early
    let store = match JsonFileStore::open(&app_config.storage.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open record store: {}", e);
            std::process::exit(1);
        }
    };
    let coordinator = CoordinatorLocal::new(store, &app_config);
    let axum_state = Arc::new(coordinator);

    // Configure CORS
    let cors_layer = if app_config.cors.allowed_origins.is_empty() {
        tracing::info!("CORS: Allowing all origins (*)");
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any)
    } else {
        tracing::info!("CORS: Restricting to {:?}", app_config.cors.allowed_origins);
        let origins: Vec<_> = app_config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors::CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any)
    };

    let http_endpoints = Router::new()
        .merge(handlers::routes().with_state(axum_state))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(
            app_config.request.max_body_size_bytes,
        ))
        .layer(cors_layer);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::new(host.parse().expect("HOST must be a valid IP address"), port);
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap_or_else(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        std::process::exit(1);
    });

    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives, letting in-flight requests drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
