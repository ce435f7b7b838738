use rusqlite::{Connection, OptionalExtension};

use crate::error::{ApiError, ApiResult};
use crate::models::User;

/// Make sure a row exists for `user_id`, creating one with a default name
pub fn ensure_user(conn: &Connection, user_id: &str) -> ApiResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id, name) VALUES (?1, ?2)",
        (user_id, User::default_name(user_id)),
    )?;
    Ok(())
}

/// Create the user if needed and overwrite any profile fields that were supplied
pub fn upsert_user(
    conn: &Connection,
    user_id: &str,
    name: Option<&str>,
    username: Option<&str>,
    profile_image: Option<&str>,
) -> ApiResult<User> {
    ensure_user(conn, user_id)?;
    conn.execute(
        "UPDATE users SET
            name = COALESCE(?2, name),
            username = COALESCE(?3, username),
            profile_image = COALESCE(?4, profile_image)
         WHERE id = ?1",
        (user_id, name, username, profile_image),
    )?;
    get_user(conn, user_id)
}

pub fn find_user(conn: &Connection, user_id: &str) -> ApiResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, username, profile_image FROM users WHERE id = ?1",
            [user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                    profile_image: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: &str) -> ApiResult<User> {
    find_user(conn, user_id)?.ok_or_else(|| ApiError::NotFound {
        entity: "User",
        id: user_id.to_string(),
    })
}
