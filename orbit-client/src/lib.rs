//! Orbit client library
//!
//! Notification state, polling sync, popup and page view models, feedback
//! and chat helpers, all driven over the server's WebSocket protocol.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod feedback;
pub mod page;
pub mod popup;
pub mod store;
pub mod sync;
pub mod time;

pub use api::{ApiClient, ConnectOptions};
pub use chat::{ChatOptions, ChatSession, ChatTab, GifSelection, Group};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use feedback::{FeedbackChain, FeedbackKind, FeedbackOutcome};
pub use page::{NotificationsPage, PageView};
pub use popup::{AnchoredToTrigger, FixedCorner, PopupPresenter, PositionStrategy};
pub use store::{Action, NotificationState};
pub use sync::{NotificationApi, NotificationHandle, NotificationSync, SyncSettings};
