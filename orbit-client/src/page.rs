//! View model for the full notifications page.
//!
//! The page keeps the last list it received and keeps showing it when a
//! later fetch fails. Every fetch that returns data marks notifications
//! read.

use chrono::{DateTime, Utc};
use orbit_server::models::{Notification, NotificationKind, PostPreview};
use tracing::warn;

use crate::error::ClientResult;
use crate::sync::{NotificationApi, NotificationHandle};
use crate::time::time_ago_long;

pub const SKELETON_ROWS: usize = 5;
pub const STALE_WARNING: &str = "Connection issue detected. Showing cached notifications.";
pub const RETRY_MESSAGE: &str = "Error loading notifications. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum Thumbnail {
    Image(String),
    VideoThumbnail(String),
    VideoPlaceholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub id: String,
    pub icon: &'static str,
    pub message: String,
    /// Comment text in quotes
    pub quote: Option<String>,
    pub time_ago: String,
    pub avatar_url: Option<String>,
    pub initial: String,
    pub thumbnail: Option<Thumbnail>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaleWarning {
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageView {
    Loading { skeleton_rows: usize },
    RetryPanel { message: &'static str },
    Empty { banner: Option<StaleWarning> },
    List {
        banner: Option<StaleWarning>,
        rows: Vec<PageRow>,
    },
}

pub fn page_icon(kind: &NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Like => "❤️",
        NotificationKind::Comment => "💬",
        NotificationKind::CommentLike => "👍",
        NotificationKind::Follow => "👤",
        NotificationKind::Other(_) => "🔔",
    }
}

pub fn page_message(notification: &Notification) -> String {
    let sender = &notification.sender;
    let sender = [Some(sender.name.as_str()), sender.username.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or("Someone");
    match notification.kind {
        NotificationKind::Like => format!("{} liked your post", sender),
        NotificationKind::Comment => format!("{} commented on your post", sender),
        NotificationKind::CommentLike => format!("{} liked your comment", sender),
        NotificationKind::Follow => format!("{} started following you", sender),
        NotificationKind::Other(_) => "New notification".to_string(),
    }
}

/// Image first, then the video's thumbnail, then a generic video tile
pub fn thumbnail(post: Option<&PostPreview>) -> Option<Thumbnail> {
    let post = post.filter(|p| p.has_media())?;
    if let Some(url) = &post.image_url {
        return Some(Thumbnail::Image(url.clone()));
    }
    Some(match &post.thumbnail_url {
        Some(url) => Thumbnail::VideoThumbnail(url.clone()),
        None => Thumbnail::VideoPlaceholder,
    })
}

fn row(notification: &Notification, now: DateTime<Utc>) -> PageRow {
    PageRow {
        id: notification.id.clone(),
        icon: page_icon(&notification.kind),
        message: page_message(notification),
        quote: notification
            .comment_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| format!("\"{}\"", text)),
        time_ago: time_ago_long(&notification.created_at, now),
        avatar_url: notification.sender.profile_image.clone(),
        initial: notification
            .sender
            .name
            .chars()
            .next()
            .map(String::from)
            .unwrap_or_else(|| "?".to_string()),
        thumbnail: thumbnail(notification.post.as_ref()),
        highlighted: !notification.is_read,
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationsPage {
    data: Option<Vec<Notification>>,
    error: Option<String>,
    loading: bool,
}

impl NotificationsPage {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// Record a fetch result; returns whether read state should be cleared
    pub fn complete(&mut self, result: ClientResult<Vec<Notification>>) -> bool {
        self.loading = false;
        match result {
            Ok(notifications) => {
                self.data = Some(notifications);
                self.error = None;
                true
            }
            Err(e) => {
                warn!("Error fetching notifications: {}", e);
                self.error = Some(e.to_string());
                false
            }
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn view(&self, now: DateTime<Utc>) -> PageView {
        let Some(data) = &self.data else {
            return if self.loading {
                PageView::Loading {
                    skeleton_rows: SKELETON_ROWS,
                }
            } else if self.error.is_some() {
                PageView::RetryPanel {
                    message: RETRY_MESSAGE,
                }
            } else {
                PageView::Empty { banner: None }
            };
        };

        let banner = self.error.as_ref().map(|_| StaleWarning {
            message: STALE_WARNING,
        });
        if data.is_empty() {
            PageView::Empty { banner }
        } else {
            PageView::List {
                banner,
                rows: data.iter().map(|n| row(n, now)).collect(),
            }
        }
    }

    /// One poll tick: fetch the list and, when it arrives, mark everything read
    pub async fn refresh(
        &mut self,
        api: &dyn NotificationApi,
        user_id: &str,
        handle: &NotificationHandle,
    ) {
        self.begin_fetch();
        let result = api.user_notifications(user_id).await;
        if self.complete(result) {
            handle.mark_as_read().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::store::tests::notification;
    use crate::sync::tests::FakeApi;
    use crate::sync::{NotificationSync, SyncSettings};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[test]
    fn test_loading_then_list() {
        let mut page = NotificationsPage::new();
        assert_eq!(page.view(Utc::now()), PageView::Loading { skeleton_rows: 5 });

        assert!(page.complete(Ok(vec![notification("1", "like", false)])));
        match page.view(Utc::now()) {
            PageView::List { banner, rows } => {
                assert!(banner.is_none());
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].message, "Sam liked your post");
                assert_eq!(rows[0].icon, "❤️");
                assert_eq!(rows[0].time_ago, "Just now");
                assert!(rows[0].highlighted);
            }
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_error_without_cache_shows_retry() {
        let mut page = NotificationsPage::new();
        assert!(!page.complete(Err(ClientError::Disconnected)));
        assert_eq!(
            page.view(Utc::now()),
            PageView::RetryPanel {
                message: RETRY_MESSAGE
            }
        );
    }

    #[test]
    fn test_error_with_cache_shows_stale_warning() {
        let mut page = NotificationsPage::new();
        page.complete(Ok(vec![notification("1", "follow", true)]));
        page.begin_fetch();

        // Cached rows stay visible while refetching
        assert!(matches!(page.view(Utc::now()), PageView::List { banner: None, .. }));

        page.complete(Err(ClientError::Disconnected));
        match page.view(Utc::now()) {
            PageView::List { banner, rows } => {
                assert_eq!(banner.unwrap().message, STALE_WARNING);
                assert!(!rows[0].highlighted);
            }
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_list() {
        let mut page = NotificationsPage::new();
        page.complete(Ok(Vec::new()));
        assert_eq!(page.view(Utc::now()), PageView::Empty { banner: None });
    }

    #[test]
    fn test_row_text() {
        let mut n = notification("1", "comment", false);
        n.sender.name = String::new();
        n.comment_text = Some("nice!".to_string());
        assert_eq!(page_message(&n), "Someone commented on your post");

        let r = row(&n, Utc::now());
        assert_eq!(r.quote.as_deref(), Some("\"nice!\""));
        assert_eq!(r.initial, "?");

        let other = notification("2", "mention", false);
        assert_eq!(page_message(&other), "New notification");
        assert_eq!(page_icon(&other.kind), "🔔");
    }

    #[test]
    fn test_message_falls_back_to_username() {
        let mut n = notification("1", "follow", false);
        n.sender.name = "  ".to_string();
        n.sender.username = Some("sam_k".to_string());
        assert_eq!(page_message(&n), "sam_k started following you");

        n.sender.name = "Sam".to_string();
        assert_eq!(page_message(&n), "Sam started following you");
    }

    #[test]
    fn test_thumbnail_choice() {
        let image = PostPreview {
            image_url: Some("i.jpg".to_string()),
            video_url: Some("v.mp4".to_string()),
            thumbnail_url: Some("t.jpg".to_string()),
        };
        assert_eq!(thumbnail(Some(&image)), Some(Thumbnail::Image("i.jpg".to_string())));

        let video = PostPreview {
            image_url: None,
            ..image.clone()
        };
        assert_eq!(
            thumbnail(Some(&video)),
            Some(Thumbnail::VideoThumbnail("t.jpg".to_string()))
        );

        let bare_video = PostPreview {
            thumbnail_url: None,
            ..video
        };
        assert_eq!(thumbnail(Some(&bare_video)), Some(Thumbnail::VideoPlaceholder));

        let thumb_only = PostPreview {
            thumbnail_url: Some("t.jpg".to_string()),
            ..PostPreview::default()
        };
        assert_eq!(thumbnail(Some(&thumb_only)), None);
        assert_eq!(thumbnail(None), None);
    }

    #[tokio::test]
    async fn test_every_successful_refresh_marks_read() {
        let api = Arc::new(FakeApi::default());
        for _ in 0..2 {
            api.lists
                .lock()
                .unwrap()
                .push_back(Ok(vec![notification("1", "like", false)]));
        }
        let sync = Arc::new(NotificationSync::new(api.clone(), "me", SyncSettings::default()));
        let handle = NotificationHandle::Attached(sync);

        let mut page = NotificationsPage::new();
        page.refresh(api.as_ref(), "me", &handle).await;
        page.refresh(api.as_ref(), "me", &handle).await;
        assert_eq!(api.marks.load(Ordering::SeqCst), 2);

        // Failed fetch does not mark
        page.refresh(api.as_ref(), "me", &handle).await;
        assert_eq!(api.marks.load(Ordering::SeqCst), 2);
        assert_eq!(handle.unread_count(), 0);
    }
}
