//! Chat screen helpers: tab state, locally created groups, GIF attachments
//! and a per-conversation session over [`ApiClient`].

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use orbit_server::models::{FileUpload, MediaInput, Message};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatTab {
    #[default]
    All,
    Groups,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            members,
        }
    }
}

type GroupCallback = Box<dyn Fn(&Group) + Send + Sync>;
type TabCallback = Box<dyn Fn(ChatTab) + Send + Sync>;

/// Tab bar above the chat list, plus groups created this session
#[derive(Default)]
pub struct ChatOptions {
    active_tab: ChatTab,
    groups: Vec<Group>,
    create_open: bool,
    on_tab_change: Option<TabCallback>,
    on_group_created: Option<GroupCallback>,
}

impl fmt::Debug for ChatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatOptions")
            .field("active_tab", &self.active_tab)
            .field("groups", &self.groups)
            .field("create_open", &self.create_open)
            .finish_non_exhaustive()
    }
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_tab_change(mut self, callback: impl Fn(ChatTab) + Send + Sync + 'static) -> Self {
        self.on_tab_change = Some(Box::new(callback));
        self
    }

    pub fn on_group_created(mut self, callback: impl Fn(&Group) + Send + Sync + 'static) -> Self {
        self.on_group_created = Some(Box::new(callback));
        self
    }

    pub fn active_tab(&self) -> ChatTab {
        self.active_tab
    }

    pub fn select_tab(&mut self, tab: ChatTab) {
        self.active_tab = tab;
        if let Some(callback) = &self.on_tab_change {
            callback(tab);
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn is_create_open(&self) -> bool {
        self.create_open
    }

    pub fn open_create_group(&mut self) {
        self.create_open = true;
    }

    pub fn close_create_group(&mut self) {
        self.create_open = false;
    }

    /// Append `group` and notify the listener
    pub fn group_created(&mut self, group: Group) {
        if let Some(callback) = &self.on_group_created {
            callback(&group);
        }
        self.groups.push(group);
    }
}

/// A GIF picked from the picker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GifSelection {
    pub url: String,
    pub title: Option<String>,
    pub id: Option<String>,
    pub size: Option<i64>,
}

impl GifSelection {
    pub fn to_media_input(&self) -> MediaInput {
        MediaInput {
            url: Some(self.url.clone()),
            media_type: Some("gif".to_string()),
            filename: self.title.clone().or_else(|| self.id.clone()),
            size: self.size,
        }
    }
}

/// Wrap raw bytes as an inline upload
pub fn file_upload(filename: &str, mimetype: &str, bytes: &[u8]) -> FileUpload {
    FileUpload {
        filename: filename.to_string(),
        mimetype: mimetype.to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}

/// One conversation between the signed-in user and `peer_id`
#[derive(Clone)]
pub struct ChatSession {
    api: Arc<ApiClient>,
    peer_id: String,
}

impl ChatSession {
    pub fn new(api: Arc<ApiClient>, peer_id: impl Into<String>) -> Self {
        Self {
            api,
            peer_id: peer_id.into(),
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Both directions, oldest first
    pub async fn history(&self) -> ClientResult<Vec<Message>> {
        self.api.get_messages(self.api.user_id(), &self.peer_id).await
    }

    pub async fn send_text(&self, text: &str) -> ClientResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::InvalidInput("Message is empty".to_string()));
        }
        self.api
            .send_message(&self.peer_id, Some(text.to_string()), None)
            .await
    }

    pub async fn send_media(&self, caption: Option<String>, media: MediaInput) -> ClientResult<Message> {
        if media.is_empty() {
            return Err(ClientError::InvalidInput("Media is empty".to_string()));
        }
        self.api.send_message(&self.peer_id, caption, Some(media)).await
    }

    pub async fn send_gif(&self, gif: &GifSelection) -> ClientResult<Message> {
        self.send_media(None, gif.to_media_input()).await
    }

    pub async fn send_file(&self, caption: Option<String>, file: FileUpload) -> ClientResult<Message> {
        self.api
            .send_message_with_file(&self.peer_id, caption, file)
            .await
    }

    pub async fn mark_seen(&self, message_id: &str) -> ClientResult<bool> {
        self.api.mark_message_as_seen(message_id).await
    }

    /// Mark everything the peer sent us as seen
    pub async fn mark_all_seen(&self) -> ClientResult<bool> {
        self.api.mark_all_messages_as_seen(&self.peer_id).await
    }

    pub async fn delete(&self, message_id: &str) -> ClientResult<bool> {
        self.api.delete_message(message_id).await
    }

    /// Messages from the peer we have not seen yet
    pub async fn unread_count(&self) -> ClientResult<i64> {
        self.api
            .get_unread_count(&self.peer_id, self.api.user_id())
            .await
    }
}
