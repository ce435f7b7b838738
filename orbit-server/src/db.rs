use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ApiError, ApiResult};

pub struct Database(pub Mutex<Connection>);

impl Database {
    /// Open (or create) the database at `path`; `:memory:` opens a private in-memory store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        init_schema(&conn)?;
        Ok(Self(Mutex::new(conn)))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn lock(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.0
            .lock()
            .map_err(|e| ApiError::Internal(format!("Lock poisoned: {}", e)))
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        -- Users seen by the server (connected users and message peers)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            username TEXT,
            profile_image TEXT
        );

        -- Direct messages
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            sender_id TEXT NOT NULL REFERENCES users(id),
            receiver_id TEXT NOT NULL REFERENCES users(id),
            content TEXT,
            media_url TEXT,
            media_type TEXT,
            media_filename TEXT,
            media_size INTEGER,
            seen INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        -- Social notifications (likes, comments, follows)
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            recipient_id TEXT NOT NULL REFERENCES users(id),
            sender_id TEXT NOT NULL REFERENCES users(id),
            kind TEXT NOT NULL,
            comment_text TEXT,
            post_image_url TEXT,
            post_video_url TEXT,
            post_thumbnail_url TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages(sender_id, receiver_id);
        CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id);
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'messages', 'notifications')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
