//! Operation arguments with garde validation.
//!
//! Argument names follow the camelCase names clients send on the wire.

use garde::Validate;
use serde::{Deserialize, Serialize};

use super::message::{FileUpload, MediaInput};
use super::notification::PostPreview;
use crate::error::ApiError;

/// Validation constants
pub const MAX_ID_LENGTH: usize = 128;
pub const MAX_MESSAGE_LENGTH: usize = 10000;
pub const MAX_COMMENT_LENGTH: usize = 2200;
pub const MAX_ROOM_ID_LENGTH: usize = 256;

/// Notification types a client may create
fn validate_notification_type(value: &str, _ctx: &()) -> garde::Result {
    match value {
        "follow" | "like" | "comment" | "comment_like" => Ok(()),
        _ => Err(garde::Error::new("Invalid notification type")),
    }
}

/// Sender/receiver pair identifying a conversation direction
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct ConversationArgs {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub sender_id: String,
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub receiver_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
pub struct JoinCallArgs {
    #[serde(rename = "roomID")]
    #[garde(length(min = 1, max = MAX_ROOM_ID_LENGTH))]
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct SendMessageArgs {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub sender_id: String,
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub receiver_id: String,
    #[garde(length(max = MAX_MESSAGE_LENGTH))]
    pub message: Option<String>,
    #[garde(skip)]
    pub media: Option<MediaInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct SendFileArgs {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub sender_id: String,
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub receiver_id: String,
    #[garde(length(max = MAX_MESSAGE_LENGTH))]
    pub message: Option<String>,
    #[garde(skip)]
    pub file: Option<FileUpload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct MessageIdArgs {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct UserArgs {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationArgs {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub recipient_id: String,
    #[serde(rename = "type")]
    #[garde(custom(validate_notification_type))]
    pub kind: String,
    #[garde(length(max = MAX_COMMENT_LENGTH))]
    pub comment_text: Option<String>,
    #[garde(skip)]
    pub post: Option<PostPreview>,
}

/// Helper trait to convert garde validation errors to [`ApiError`]
pub trait ValidateExt {
    fn validate_input(&self) -> Result<(), ApiError>;
}

impl<T: Validate<Context = ()>> ValidateExt for T {
    fn validate_input(&self) -> Result<(), ApiError> {
        self.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))
    }
}

/// Trimmed message text, or `None` when nothing printable remains
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.and_then(|t| {
        let trimmed = t.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
