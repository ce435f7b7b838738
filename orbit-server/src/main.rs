use std::sync::Arc;

use orbit_server::{serve, ServerConfig, ServerState};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    let state = match ServerState::from_config(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize server state: {}", e);
            std::process::exit(1);
        }
    };

    // Bind TCP listener
    let listener = match TcpListener::bind(&config.addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.addr, e);
            std::process::exit(1);
        }
    };

    info!(
        db = %config.db_path,
        uploads = %config.upload_dir,
        calls = config.call.is_some(),
        "Orbit server listening on {}",
        config.addr
    );

    serve(listener, state).await;
}
