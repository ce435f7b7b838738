//! Social notifications and the unread badge rule.
//!
//! Only `like`, `comment` and `comment_like` notifications count toward the
//! unread badge. `follow` notifications are listed but never counted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification kinds that contribute to the unread badge
pub const BADGE_KINDS: [NotificationKind; 3] = [
    NotificationKind::Like,
    NotificationKind::Comment,
    NotificationKind::CommentLike,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    CommentLike,
    /// Any type this build does not know about
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::CommentLike => "comment_like",
            NotificationKind::Other(other) => other,
        }
    }

    /// Whether an unread notification of this kind shows on the badge
    pub fn counts_toward_badge(&self) -> bool {
        BADGE_KINDS.contains(self)
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "follow" => NotificationKind::Follow,
            "like" => NotificationKind::Like,
            "comment" => NotificationKind::Comment,
            "comment_like" => NotificationKind::CommentLike,
            _ => NotificationKind::Other(value),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(value: &str) -> Self {
        NotificationKind::from(value.to_string())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSender {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostPreview {
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl PostPreview {
    pub fn has_media(&self) -> bool {
        self.image_url.is_some() || self.video_url.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub sender: NotificationSender,
    pub comment_text: Option<String>,
    pub post: Option<PostPreview>,
    pub is_read: bool,
    pub created_at: String,
}

/// Number of unread, badge-eligible notifications in `notifications`
pub fn unread_badge_count(notifications: &[Notification]) -> usize {
    notifications
        .iter()
        .filter(|n| n.kind.counts_toward_badge())
        .filter(|n| !n.is_read)
        .count()
}
