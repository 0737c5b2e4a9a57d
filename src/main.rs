//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Opens the session storage and starts the session watcher
//! - Starts the HTTP server with graceful shutdown support

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use shortener_web::api::ApiClient;
use shortener_web::clipboard::SystemClipboard;
use shortener_web::config::Config;
use shortener_web::database::{init_db, AppState};
use shortener_web::route::create_app;

/// Application entry point
///
/// 1. Loads environment variables from .env file
/// 2. Reads configuration (see `config` for the variables)
/// 3. Opens the embedded session storage
/// 4. Creates the application state, session watcher and router
/// 5. Starts the HTTP server with graceful shutdown handling
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shortener_web=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    let db = init_db(&config.storage_path).expect("Failed to initialize session storage");
    let api = ApiClient::new(&config.backend_url, config.request_timeout)
        .expect("Failed to build HTTP client");

    let state = AppState::new(Arc::new(db), api, Arc::new(SystemClipboard));

    // Keep the login state fresh for the route guard
    let watcher = state.auth.spawn_watcher();

    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("front-end running at http://localhost:{}", config.port);
    tracing::info!("shortener API: {}", config.backend_url);
    tracing::info!("session storage: {}", config.storage_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    watcher.abort();
}

/// Handles graceful shutdown signals
///
/// Returns on SIGINT (Ctrl+C) or, on Unix, SIGTERM. Open connections are
/// allowed to complete and the storage file is closed cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    // On non-Unix systems (Windows), only handle Ctrl+C
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, stopping server");
}
