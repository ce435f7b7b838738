mod call;
pub mod input;
mod message;
pub mod notification;
mod user;

pub use call::ZegoTokenResponse;
pub use message::{FileUpload, Media, MediaInput, Message};
pub use notification::{Notification, NotificationKind, NotificationSender, PostPreview};
pub use user::User;
