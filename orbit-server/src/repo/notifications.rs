use rusqlite::{Connection, Row};

use super::users::ensure_user;
use crate::error::ApiResult;
use crate::models::notification::unread_badge_count;
use crate::models::{Notification, NotificationKind, NotificationSender, PostPreview};

const SELECT_NOTIFICATION: &str = "
    SELECT n.id, n.kind, n.comment_text, n.post_image_url, n.post_video_url,
           n.post_thumbnail_url, n.is_read, n.created_at,
           s.id, s.name, s.profile_image, s.username
    FROM notifications n
    JOIN users s ON s.id = n.sender_id";

pub struct NewNotification<'a> {
    pub recipient_id: &'a str,
    pub sender_id: &'a str,
    pub kind: NotificationKind,
    pub comment_text: Option<String>,
    pub post: Option<PostPreview>,
}

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    let post = PostPreview {
        image_url: row.get(3)?,
        video_url: row.get(4)?,
        thumbnail_url: row.get(5)?,
    };
    let has_post = post.image_url.is_some() || post.video_url.is_some() || post.thumbnail_url.is_some();
    let created_at: i64 = row.get(7)?;
    Ok(Notification {
        id: row.get(0)?,
        kind: NotificationKind::from(row.get::<_, String>(1)?),
        comment_text: row.get(2)?,
        post: has_post.then_some(post),
        is_read: row.get::<_, i32>(6)? == 1,
        created_at: created_at.to_string(),
        sender: NotificationSender {
            id: row.get(8)?,
            name: row.get(9)?,
            username: row.get(11)?,
            profile_image: row.get(10)?,
        },
    })
}

pub fn insert_notification(conn: &Connection, new: NewNotification<'_>) -> ApiResult<Notification> {
    ensure_user(conn, new.recipient_id)?;
    ensure_user(conn, new.sender_id)?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp_millis();
    let post = new.post.unwrap_or_default();

    conn.execute(
        "INSERT INTO notifications (id, recipient_id, sender_id, kind, comment_text,
                                    post_image_url, post_video_url, post_thumbnail_url,
                                    is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
        (
            &id,
            new.recipient_id,
            new.sender_id,
            new.kind.as_str(),
            &new.comment_text,
            &post.image_url,
            &post.video_url,
            &post.thumbnail_url,
            now,
        ),
    )?;

    let sql = format!("{} WHERE n.id = ?1", SELECT_NOTIFICATION);
    let notification = conn.query_row(&sql, [&id], notification_from_row)?;
    Ok(notification)
}

/// All notifications addressed to `user_id`, newest first
pub fn list_for_user(conn: &Connection, user_id: &str) -> ApiResult<Vec<Notification>> {
    let sql = format!(
        "{} WHERE n.recipient_id = ?1 ORDER BY n.created_at DESC, n.rowid DESC",
        SELECT_NOTIFICATION
    );
    let mut stmt = conn.prepare(&sql)?;
    let notifications = stmt
        .query_map([user_id], notification_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notifications)
}

/// Unread badge count for `user_id`, using the same allow-list as clients
pub fn unread_count(conn: &Connection, user_id: &str) -> ApiResult<i64> {
    let notifications = list_for_user(conn, user_id)?;
    Ok(unread_badge_count(&notifications) as i64)
}

/// Mark every notification of `user_id` as read; returns how many changed
pub fn mark_all_read(conn: &Connection, user_id: &str) -> ApiResult<usize> {
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
        [user_id],
    )?;
    Ok(changed)
}
