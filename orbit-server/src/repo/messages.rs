use rusqlite::{Connection, OptionalExtension, Row};

use super::users::ensure_user;
use crate::error::{ApiError, ApiResult};
use crate::models::{Media, Message, User};

const SELECT_MESSAGE: &str = "
    SELECT m.id, m.content, m.media_url, m.media_type, m.media_filename, m.media_size,
           m.seen, m.created_at,
           s.id, s.name, s.username, s.profile_image,
           r.id, r.name, r.username, r.profile_image
    FROM messages m
    JOIN users s ON s.id = m.sender_id
    JOIN users r ON r.id = m.receiver_id";

/// A message about to be stored; at least one of `text` and `media` is set
pub struct NewMessage<'a> {
    pub sender_id: &'a str,
    pub receiver_id: &'a str,
    pub text: Option<String>,
    pub media: Option<Media>,
}

/// Who sent and who received a stored message
#[derive(Debug, Clone, PartialEq)]
pub struct Participants {
    pub sender_id: String,
    pub receiver_id: String,
}

impl Participants {
    pub fn includes(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The participant that is not `user_id`
    pub fn other(&self, user_id: &str) -> &str {
        if self.sender_id == user_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }
}

fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    let media = Media {
        url: row.get(2)?,
        media_type: row.get(3)?,
        filename: row.get(4)?,
        size: row.get(5)?,
    };
    let created_at: i64 = row.get(7)?;
    Ok(Message {
        id: row.get(0)?,
        message: row.get(1)?,
        media: if media.is_empty() { None } else { Some(media) },
        seen: row.get::<_, i32>(6)? == 1,
        created_at: created_at.to_string(),
        sender: User {
            id: row.get(8)?,
            name: row.get(9)?,
            username: row.get(10)?,
            profile_image: row.get(11)?,
        },
        receiver: User {
            id: row.get(12)?,
            name: row.get(13)?,
            username: row.get(14)?,
            profile_image: row.get(15)?,
        },
    })
}

pub fn insert_message(conn: &Connection, new: NewMessage<'_>) -> ApiResult<Message> {
    if new.text.is_none() && new.media.is_none() {
        return Err(ApiError::Validation(
            "A message needs text or media".to_string(),
        ));
    }

    ensure_user(conn, new.sender_id)?;
    ensure_user(conn, new.receiver_id)?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp_millis();
    let media = new.media.unwrap_or_default();

    conn.execute(
        "INSERT INTO messages (id, sender_id, receiver_id, content, media_url, media_type,
                               media_filename, media_size, seen, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
        (
            &id,
            new.sender_id,
            new.receiver_id,
            &new.text,
            &media.url,
            &media.media_type,
            &media.filename,
            media.size,
            now,
        ),
    )?;

    get_message(conn, &id)
}

pub fn find_message(conn: &Connection, message_id: &str) -> ApiResult<Option<Message>> {
    let sql = format!("{} WHERE m.id = ?1", SELECT_MESSAGE);
    let message = conn
        .query_row(&sql, [message_id], message_from_row)
        .optional()?;
    Ok(message)
}

pub fn get_message(conn: &Connection, message_id: &str) -> ApiResult<Message> {
    find_message(conn, message_id)?.ok_or_else(|| ApiError::NotFound {
        entity: "Message",
        id: message_id.to_string(),
    })
}

/// Both directions of the conversation between two users, oldest first
pub fn list_conversation(conn: &Connection, user_a: &str, user_b: &str) -> ApiResult<Vec<Message>> {
    let sql = format!(
        "{} WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
              OR (m.sender_id = ?2 AND m.receiver_id = ?1)
         ORDER BY m.created_at ASC, m.rowid ASC",
        SELECT_MESSAGE
    );
    let mut stmt = conn.prepare(&sql)?;
    let messages = stmt
        .query_map([user_a, user_b], message_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

/// Unseen messages sent by `sender_id` to `receiver_id`
pub fn count_unseen(conn: &Connection, sender_id: &str, receiver_id: &str) -> ApiResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE sender_id = ?1 AND receiver_id = ?2 AND seen = 0",
        [sender_id, receiver_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn participants(conn: &Connection, message_id: &str) -> ApiResult<Option<Participants>> {
    let found = conn
        .query_row(
            "SELECT sender_id, receiver_id FROM messages WHERE id = ?1",
            [message_id],
            |row| {
                Ok(Participants {
                    sender_id: row.get(0)?,
                    receiver_id: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

/// Flag a single message as seen; returns false if it does not exist
pub fn mark_seen(conn: &Connection, message_id: &str) -> ApiResult<bool> {
    let changed = conn.execute("UPDATE messages SET seen = 1 WHERE id = ?1", [message_id])?;
    Ok(changed > 0)
}

/// Flag every unseen message from `sender_id` to `receiver_id`; returns the ids that changed
pub fn mark_all_seen(
    conn: &Connection,
    sender_id: &str,
    receiver_id: &str,
) -> ApiResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "UPDATE messages SET seen = 1
         WHERE sender_id = ?1 AND receiver_id = ?2 AND seen = 0
         RETURNING id",
    )?;
    let ids = stmt
        .query_map([sender_id, receiver_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn delete_message(conn: &Connection, message_id: &str) -> ApiResult<bool> {
    let changed = conn.execute("DELETE FROM messages WHERE id = ?1", [message_id])?;
    Ok(changed > 0)
}
