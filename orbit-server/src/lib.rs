//! Orbit messaging server library
//!
//! Exposes the server components so the binary, the client crate and the
//! integration tests can all start a server on their own listener.

pub mod config;
mod connection;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod protocol;
pub mod repo;
pub mod state;
pub mod uploads;
pub mod video;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{error, info};

pub use config::ServerConfig;
pub use connection::{handle_connection, handle_message};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use protocol::{Operation, WsMessage};
pub use state::ServerState;

/// Accept connections on `listener` until the task is dropped
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!("New connection from {}", peer_addr);

                let state = state.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws_stream) => {
                            handle_connection(ws_stream, state).await;
                        }
                        Err(e) => {
                            error!("WebSocket handshake failed for {}: {}", peer_addr, e);
                        }
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
