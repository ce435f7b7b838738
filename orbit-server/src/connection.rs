use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, ErrorBody};
use crate::handlers::handle_operation;
use crate::models::User;
use crate::protocol::WsMessage;
use crate::repo::users::upsert_user;
use crate::state::ServerState;

/// Time a new connection has to send its `connect` frame
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity announced in a `connect` frame
#[derive(Debug, Clone)]
struct ConnectInfo {
    user_id: String,
    name: Option<String>,
    username: Option<String>,
    profile_image: Option<String>,
}

/// Handle a single WebSocket connection
pub async fn handle_connection(ws_stream: WebSocketStream<TcpStream>, state: Arc<ServerState>) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Wait for Connect message to authenticate
    let info = match wait_for_connect(&mut ws_receiver, state.access_token.as_deref()).await {
        Ok(info) => info,
        Err(reason) => {
            warn!("Connection rejected: {}", reason);
            let rejection = WsMessage::AuthResponse {
                success: false,
                message: reason,
            };
            if let Ok(json) = serde_json::to_string(&rejection) {
                let _ = ws_sender.send(Message::Text(json.into())).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };

    // Record the profile the client announced
    let session = match register_user(&state, &info) {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to register user {}: {}", info.user_id, e);
            return;
        }
    };
    let user_id = session.id.clone();
    info!("User connected: {}", user_id);

    // Create channel for sending frames to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let reply_tx = tx.clone();

    // Register client
    state.add_client(user_id.clone(), tx);

    // Send auth success response
    let auth_response = WsMessage::AuthResponse {
        success: true,
        message: "Connected to server".to_string(),
    };
    match serde_json::to_string(&auth_response) {
        Ok(json) => {
            if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                error!("Failed to send auth response to {}: {}", user_id, e);
            }
        }
        Err(e) => {
            error!("Failed to serialize auth response for {}: {}", user_id, e);
        }
    }

    // Flush pushes queued while the user was offline
    let pending = state.take_queued(&user_id);
    if !pending.is_empty() {
        info!(
            "Delivering {} pending messages to {}",
            pending.len(),
            user_id
        );
        for msg in pending {
            let _ = reply_tx.send(msg);
        }
    }

    // Spawn task to forward frames from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            res = ws_receiver.next() => {
                match res {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_message(&text, &session, &state) {
                            if reply_tx.send(reply).is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("User {} sent close frame", user_id);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error for user {}: {}", user_id, e);
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended for user {}", user_id);
                        break;
                    }
                    _ => {}
                }
            }
            _ = &mut send_task => {
                info!("Send task finished for user {} (likely connection lost)", user_id);
                break;
            }
        }
    }

    // Cleanup
    send_task.abort();
    state.remove_client(&user_id, &reply_tx);
    drop(reply_tx);

    info!("User disconnected: {}", user_id);
}

fn register_user(state: &ServerState, info: &ConnectInfo) -> Result<User, ApiError> {
    let conn = state.db.lock()?;
    upsert_user(
        &conn,
        &info.user_id,
        info.name.as_deref(),
        info.username.as_deref(),
        info.profile_image.as_deref(),
    )
}

/// Wait for the Connect frame from a new connection
async fn wait_for_connect(
    receiver: &mut futures_util::stream::SplitStream<WebSocketStream<TcpStream>>,
    expected_token: Option<&str>,
) -> Result<ConnectInfo, String> {
    let wait = async {
        while let Some(result) = receiver.next().await {
            let text = match result {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::Connect {
                    user_id,
                    name,
                    username,
                    profile_image,
                    token,
                }) => {
                    let user_id = user_id.trim().to_string();
                    if user_id.is_empty() {
                        return Err("Missing user id".to_string());
                    }
                    if let Some(expected) = expected_token {
                        match token {
                            Some(received) if received == expected => {}
                            Some(_) => {
                                warn!("Authentication failed for {}: Invalid token", user_id);
                                return Err("Invalid token".to_string());
                            }
                            None => {
                                warn!("Authentication failed for {}: No token provided", user_id);
                                return Err("No token provided".to_string());
                            }
                        }
                    }
                    return Ok(ConnectInfo {
                        user_id,
                        name,
                        username,
                        profile_image,
                    });
                }
                Ok(other) => {
                    debug!("Ignoring {:?} before connect", other);
                }
                Err(e) => {
                    warn!("Failed to parse Connect message: {}", e);
                }
            }
        }
        Err("Connection closed before authentication".to_string())
    };

    match tokio::time::timeout(CONNECT_TIMEOUT, wait).await {
        Ok(result) => result,
        Err(_) => Err("Authentication timeout".to_string()),
    }
}

/// Handle an incoming frame from an authenticated client.
///
/// Returns the frame to send back on this connection, if any. Every
/// `request` frame produces exactly one `response` carrying its id.
pub fn handle_message(text: &str, session: &User, state: &ServerState) -> Option<String> {
    let reply = match serde_json::from_str::<WsMessage>(text) {
        Ok(WsMessage::Request { request_id, op }) => {
            let name = op.name();
            match handle_operation(op, session, state) {
                Ok(data) => WsMessage::Response {
                    request_id,
                    data: Some(data),
                    error: None,
                },
                Err(e) => {
                    warn!(op = name, user_id = %session.id, "Operation failed: {}", e);
                    WsMessage::Response {
                        request_id,
                        data: None,
                        error: Some(ErrorBody::from(&e)),
                    }
                }
            }
        }
        Ok(WsMessage::Connect { .. }) => {
            // Already authenticated, ignore
            return None;
        }
        Ok(_) => WsMessage::Error {
            message: "Only request frames are accepted from clients".to_string(),
        },
        Err(e) => {
            warn!("Failed to parse message from {}: {}", session.id, e);
            malformed_request(text, &e).unwrap_or(WsMessage::Error {
                message: format!("Invalid frame: {}", e),
            })
        }
    };

    match serde_json::to_string(&reply) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize reply for {}: {}", session.id, e);
            None
        }
    }
}

/// A `response` error for a request frame whose operation could not be decoded
fn malformed_request(text: &str, err: &serde_json::Error) -> Option<WsMessage> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    if value.get("type")?.as_str()? != "request" {
        return None;
    }
    let request_id = value.get("request_id")?.as_str()?.to_string();
    Some(WsMessage::Response {
        request_id,
        data: None,
        error: Some(ErrorBody::from(&ApiError::Validation(err.to_string()))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::uploads::UploadStore;
    use serde_json::json;

    fn state() -> ServerState {
        ServerState::new(
            Database::open_in_memory().unwrap(),
            UploadStore::new(std::env::temp_dir().join("orbit-connection-tests"), "/uploads", 1024),
        )
    }

    fn alice() -> User {
        User {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            username: None,
            profile_image: None,
        }
    }

    fn reply(text: &str, state: &ServerState) -> serde_json::Value {
        let raw = handle_message(text, &alice(), state).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_request_gets_response_with_same_id() {
        let state = state();
        let frame = json!({
            "type": "request",
            "request_id": "r-1",
            "op": {
                "name": "sendMessage",
                "senderId": "alice",
                "receiverId": "bob",
                "message": "hi bob"
            }
        });

        let value = reply(&frame.to_string(), &state);
        assert_eq!(value["type"], "response");
        assert_eq!(value["request_id"], "r-1");
        assert_eq!(value["data"]["message"], "hi bob");
        assert_eq!(value["data"]["sender"]["id"], "alice");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failed_operation_carries_error_code() {
        let state = state();
        let frame = json!({
            "type": "request",
            "request_id": "r-2",
            "op": { "name": "getUserNotifications", "userId": "bob" }
        });

        let value = reply(&frame.to_string(), &state);
        assert_eq!(value["request_id"], "r-2");
        assert_eq!(value["error"]["code"], "unauthorized");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_unknown_operation_still_gets_response() {
        let state = state();
        let frame = json!({
            "type": "request",
            "request_id": "r-3",
            "op": { "name": "dropTables" }
        });

        let value = reply(&frame.to_string(), &state);
        assert_eq!(value["type"], "response");
        assert_eq!(value["request_id"], "r-3");
        assert_eq!(value["error"]["code"], "validation");
    }

    #[test]
    fn test_garbage_and_server_frames() {
        let state = state();

        let value = reply("not json", &state);
        assert_eq!(value["type"], "error");

        let value = reply(r#"{"type":"message_deleted","message_id":"m"}"#, &state);
        assert_eq!(value["type"], "error");

        assert!(handle_message(r#"{"type":"connect","user_id":"alice"}"#, &alice(), &state).is_none());
    }
}
