use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use orbit_server::models::input::{
    ConversationArgs, CreateNotificationArgs, JoinCallArgs, MessageIdArgs, SendFileArgs,
    SendMessageArgs, UserArgs,
};
use orbit_server::models::{
    FileUpload, MediaInput, Message as ChatMessage, Notification, PostPreview, ZegoTokenResponse,
};
use orbit_server::{Operation, WsMessage};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::sync::NotificationApi;

/// Capacity of the push-event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Internal message type for the write channel
enum WriteMessage {
    Data(String),
    Close,
}

type PendingMap = Arc<StdMutex<HashMap<String, oneshot::Sender<ClientResult<Value>>>>>;

/// Identity sent in the `connect` frame
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub user_id: String,
    pub name: Option<String>,
    pub token: Option<String>,
}

/// Request/response client for the Orbit server
pub struct ApiClient {
    user_id: String,
    write_tx: mpsc::UnboundedSender<WriteMessage>,
    pending: PendingMap,
    events_tx: broadcast::Sender<WsMessage>,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
}

impl ApiClient {
    /// Connect as the user named in `config`
    pub async fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let user_id = config
            .user_id
            .clone()
            .ok_or_else(|| ClientError::Auth("No user signed in".to_string()))?;
        let options = ConnectOptions {
            user_id,
            name: config.user_name.clone(),
            token: config.access_token.clone(),
        };
        Self::connect_with(&config.server_url, options, config.request_timeout).await
    }

    pub async fn connect_with(
        server_url: &str,
        options: ConnectOptions,
        request_timeout: Duration,
    ) -> ClientResult<Self> {
        info!(url = %server_url, "Connecting to Orbit server");
        let (ws_stream, _) = connect_async(server_url).await?;
        let (mut ws_write, mut ws_read) = ws_stream.split();

        // Send Connect message
        let connect_msg = WsMessage::Connect {
            user_id: options.user_id.clone(),
            name: options.name,
            username: None,
            profile_image: None,
            token: options.token,
        };
        ws_write
            .send(Message::Text(serde_json::to_string(&connect_msg)?.into()))
            .await?;

        // Wait for auth response
        let auth = tokio::time::timeout(request_timeout, async {
            while let Some(frame) = ws_read.next().await {
                if let Message::Text(text) = frame? {
                    if let Ok(WsMessage::AuthResponse { success, message }) =
                        serde_json::from_str::<WsMessage>(&text)
                    {
                        return Ok((success, message));
                    }
                    warn!("Unexpected frame during auth");
                }
            }
            Err(ClientError::Disconnected)
        })
        .await
        .map_err(|_| ClientError::Timeout(request_timeout))??;

        match auth {
            (true, message) => info!("Authenticated with server: {}", message),
            (false, message) => {
                error!("Authentication failed: {}", message);
                return Err(ClientError::Auth(message));
            }
        }

        let (write_tx, mut rx) = mpsc::unbounded_channel::<WriteMessage>();
        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));

        let task_pending = pending.clone();
        let task_events = events_tx.clone();
        let task_connected = connected.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(msg) = rx.recv() => {
                        match msg {
                            WriteMessage::Data(data) => {
                                if ws_write.send(Message::Text(data.into())).await.is_err() {
                                    error!("Failed to send frame to server");
                                    break;
                                }
                            }
                            WriteMessage::Close => {
                                info!("Close requested, sending close frame");
                                if let Err(e) = ws_write.send(Message::Close(None)).await {
                                    warn!(error = %e, "Failed to send close frame");
                                }
                                break;
                            }
                        }
                    }
                    msg = ws_read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                route_frame(&text, &task_pending, &task_events);
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Server closed connection");
                                break;
                            }
                            Some(Err(e)) => {
                                error!(error = %e, "WebSocket error");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }

            // Cleanup: dropping the waiters fails their requests
            task_connected.store(false, Ordering::SeqCst);
            if let Ok(mut waiters) = task_pending.lock() {
                waiters.clear();
            }
            info!("Disconnected from Orbit server");
        });

        Ok(Self {
            user_id: options.user_id,
            write_tx,
            pending,
            events_tx,
            connected,
            request_timeout,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Push events (`new_message`, `message_seen`, `notification`, ...)
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.events_tx.subscribe()
    }

    /// Gracefully disconnect from the server
    pub fn disconnect(&self) {
        info!("Initiating graceful disconnect");
        let _ = self.write_tx.send(WriteMessage::Close);
    }

    fn forget(&self, request_id: &str) {
        if let Ok(mut waiters) = self.pending.lock() {
            waiters.remove(request_id);
        }
    }

    /// Send `op` and wait for its response
    pub async fn request<T: DeserializeOwned>(&self, op: Operation) -> ClientResult<T> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let name = op.name();
        let frame = serde_json::to_string(&WsMessage::Request {
            request_id: request_id.clone(),
            op,
        })?;

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ClientError::Disconnected)?
            .insert(request_id.clone(), tx);

        debug!(op = name, request_id = %request_id, "Sending request");
        if self.write_tx.send(WriteMessage::Data(frame)).is_err() {
            self.forget(&request_id);
            return Err(ClientError::Disconnected);
        }

        let value = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(ClientError::Disconnected),
            Err(_) => {
                self.forget(&request_id);
                warn!(op = name, "Request timed out");
                return Err(ClientError::Timeout(self.request_timeout));
            }
        };
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_messages(&self, sender_id: &str, receiver_id: &str) -> ClientResult<Vec<ChatMessage>> {
        self.request(Operation::GetMessages(conversation(sender_id, receiver_id)))
            .await
    }

    pub async fn get_unread_count(&self, sender_id: &str, receiver_id: &str) -> ClientResult<i64> {
        self.request(Operation::GetUnreadCount(conversation(sender_id, receiver_id)))
            .await
    }

    pub async fn join_video_call(&self, room_id: &str) -> ClientResult<ZegoTokenResponse> {
        self.request(Operation::JoinVideoCall(JoinCallArgs {
            room_id: room_id.to_string(),
        }))
        .await
    }

    pub async fn send_message(
        &self,
        receiver_id: &str,
        message: Option<String>,
        media: Option<MediaInput>,
    ) -> ClientResult<ChatMessage> {
        self.request(Operation::SendMessage(SendMessageArgs {
            sender_id: self.user_id.clone(),
            receiver_id: receiver_id.to_string(),
            message,
            media,
        }))
        .await
    }

    pub async fn send_message_with_file(
        &self,
        receiver_id: &str,
        message: Option<String>,
        file: FileUpload,
    ) -> ClientResult<ChatMessage> {
        self.request(Operation::SendMessageWithFile(SendFileArgs {
            sender_id: self.user_id.clone(),
            receiver_id: receiver_id.to_string(),
            message,
            file: Some(file),
        }))
        .await
    }

    pub async fn mark_message_as_seen(&self, message_id: &str) -> ClientResult<bool> {
        self.request(Operation::MarkMessageAsSeen(MessageIdArgs {
            message_id: message_id.to_string(),
        }))
        .await
    }

    pub async fn mark_all_messages_as_seen(&self, sender_id: &str) -> ClientResult<bool> {
        self.request(Operation::MarkAllMessagesAsSeen(conversation(
            sender_id,
            &self.user_id,
        )))
        .await
    }

    pub async fn delete_message(&self, message_id: &str) -> ClientResult<bool> {
        self.request(Operation::DeleteMessage(MessageIdArgs {
            message_id: message_id.to_string(),
        }))
        .await
    }

    pub async fn create_notification(
        &self,
        recipient_id: &str,
        kind: &str,
        comment_text: Option<String>,
        post: Option<PostPreview>,
    ) -> ClientResult<Notification> {
        self.request(Operation::CreateNotification(CreateNotificationArgs {
            recipient_id: recipient_id.to_string(),
            kind: kind.to_string(),
            comment_text,
            post,
        }))
        .await
    }
}

impl Drop for ApiClient {
    fn drop(&mut self) {
        let _ = self.write_tx.send(WriteMessage::Close);
    }
}

fn conversation(sender_id: &str, receiver_id: &str) -> ConversationArgs {
    ConversationArgs {
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
    }
}

fn user_args(user_id: &str) -> UserArgs {
    UserArgs {
        user_id: user_id.to_string(),
    }
}

/// Hand a response to its waiter, or publish a push event
fn route_frame(text: &str, pending: &PendingMap, events: &broadcast::Sender<WsMessage>) {
    let frame = match serde_json::from_str::<WsMessage>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Failed to parse frame from server: {}", e);
            return;
        }
    };

    match frame {
        WsMessage::Response {
            request_id,
            data,
            error,
        } => {
            let waiter = pending
                .lock()
                .ok()
                .and_then(|mut waiters| waiters.remove(&request_id));
            let Some(waiter) = waiter else {
                debug!(request_id = %request_id, "Response for unknown request");
                return;
            };
            let result = match error {
                Some(body) => Err(ClientError::from(body)),
                None => Ok(data.unwrap_or(Value::Null)),
            };
            let _ = waiter.send(result);
        }
        WsMessage::Error { message } => {
            warn!("Server reported error: {}", message);
        }
        event => {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn user_notifications(&self, user_id: &str) -> ClientResult<Vec<Notification>> {
        self.request(Operation::GetUserNotifications(user_args(user_id)))
            .await
    }

    async fn unread_notifications_count(&self, user_id: &str) -> ClientResult<i64> {
        self.request(Operation::GetUnreadNotificationsCount(user_args(user_id)))
            .await
    }

    async fn mark_notifications_as_read(&self, user_id: &str) -> ClientResult<bool> {
        self.request(Operation::MarkNotificationsAsRead(user_args(user_id)))
            .await
    }
}
