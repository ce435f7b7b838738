//! SQLite access for users, messages and notifications.
//!
//! Every function takes a borrowed connection; callers hold the database lock.

pub mod messages;
pub mod notifications;
pub mod users;
