use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::db::Database;
use crate::error::ApiResult;
use crate::protocol::WsMessage;
use crate::uploads::UploadStore;
use crate::video::CallTokenIssuer;

/// Per-user cap on pushes held for offline delivery
const MAX_QUEUED_PUSHES: usize = 1000;

/// Server state: storage, connected clients and pushes queued for offline users
pub struct ServerState {
    pub db: Database,
    pub uploads: UploadStore,
    pub calls: Option<CallTokenIssuer>,
    /// Shared secret every `connect` frame must carry, when set
    pub access_token: Option<String>,
    /// One outbound channel per open connection, keyed by user id
    pub clients: DashMap<String, Vec<mpsc::UnboundedSender<String>>>,
    /// Serialized pushes waiting for a user to come online, oldest first
    queued: DashMap<String, Vec<String>>,
}

impl ServerState {
    pub fn new(db: Database, uploads: UploadStore) -> Self {
        Self {
            db,
            uploads,
            calls: None,
            access_token: None,
            clients: DashMap::new(),
            queued: DashMap::new(),
        }
    }

    pub fn with_calls(mut self, calls: CallTokenIssuer) -> Self {
        self.calls = Some(calls);
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Open storage and wire everything described by `config`
    pub fn from_config(config: &ServerConfig) -> ApiResult<Self> {
        let db = Database::open(&config.db_path)?;
        let uploads = UploadStore::new(
            &config.upload_dir,
            &config.upload_prefix,
            config.max_upload_bytes,
        );
        let mut state = Self::new(db, uploads);

        if let Some(call) = &config.call {
            let ttl = if call.token_ttl.is_zero() {
                Duration::from_secs(1)
            } else {
                call.token_ttl
            };
            state = state.with_calls(CallTokenIssuer::new(
                call.app_id,
                call.server_secret.clone(),
                ttl,
            )?);
        }
        if let Some(token) = &config.access_token {
            state = state.with_access_token(token.clone());
        }
        Ok(state)
    }

    /// A user may hold several connections at once
    pub fn add_client(&self, user_id: String, tx: mpsc::UnboundedSender<String>) {
        self.clients.entry(user_id).or_default().push(tx);
    }

    /// Drop `conn` from `user_id`'s connections, along with any already closed
    pub fn remove_client(&self, user_id: &str, conn: &mpsc::UnboundedSender<String>) {
        if let Some(mut entry) = self.clients.get_mut(user_id) {
            entry.retain(|tx| !tx.same_channel(conn) && !tx.is_closed());
            if entry.is_empty() {
                drop(entry);
                self.clients.remove(user_id);
            }
        }
    }

    /// Write `frame` to every open connection of `user_id`; false when none took it
    pub fn deliver_now(&self, user_id: &str, frame: &str) -> bool {
        let Some(channels) = self.clients.get(user_id) else {
            return false;
        };
        channels
            .iter()
            .fold(false, |sent, tx| tx.send(frame.to_string()).is_ok() || sent)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.clients
            .get(user_id)
            .is_some_and(|channels| !channels.is_empty())
    }

    pub fn enqueue(&self, user_id: &str, frame: String) {
        let mut queue = self.queued.entry(user_id.to_string()).or_default();
        if queue.len() >= MAX_QUEUED_PUSHES {
            queue.remove(0);
            warn!(user_id, "Offline queue full, dropped oldest push");
        }
        queue.push(frame);
    }

    /// Drain the offline queue of `user_id`
    pub fn take_queued(&self, user_id: &str) -> Vec<String> {
        self.queued
            .remove(user_id)
            .map(|(_, frames)| frames)
            .unwrap_or_default()
    }

    /// Returns true when delivered live, false when queued
    pub fn send_or_queue(&self, user_id: &str, frame: &str) -> bool {
        if self.deliver_now(user_id, frame) {
            return true;
        }
        self.enqueue(user_id, frame.to_string());
        debug!(user_id, "Queued push for offline user");
        false
    }

    /// Serialize a push event and deliver (or queue) it for `user_id`
    pub fn push(&self, user_id: &str, event: &WsMessage) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send_or_queue(user_id, &json),
            Err(e) => {
                error!("Failed to serialize push for {}: {}", user_id, e);
                false
            }
        }
    }

    pub fn queued_count(&self, user_id: &str) -> usize {
        self.queued
            .get(user_id)
            .map_or(0, |frames| frames.len())
    }
}
