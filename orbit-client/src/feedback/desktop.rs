use std::sync::Arc;

use tracing::{debug, warn};

use super::FeedbackError;

const DEFAULT_ICON: &str = "/favicon.ico";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesktopNotification {
    pub title: String,
    pub body: Option<String>,
    pub icon: String,
    pub badge: String,
}

impl DesktopNotification {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_ICON.to_string(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Platform notification center
pub trait DesktopNotifier: Send + Sync {
    fn permission(&self) -> Permission;

    fn request_permission(&self) -> Permission;

    fn show(&self, notification: &DesktopNotification) -> Result<(), FeedbackError>;
}

/// Desktop notifications that stay silent unless the user granted permission
pub struct DesktopNotifications {
    notifier: Option<Arc<dyn DesktopNotifier>>,
}

impl DesktopNotifications {
    pub fn new(notifier: Arc<dyn DesktopNotifier>) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    /// No notification center on this platform
    pub fn unsupported() -> Self {
        Self { notifier: None }
    }

    pub fn request_permission(&self) -> bool {
        match &self.notifier {
            Some(notifier) => notifier.request_permission() == Permission::Granted,
            None => false,
        }
    }

    /// Returns whether the notification was shown
    pub fn show(&self, notification: &DesktopNotification) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };
        if notifier.permission() != Permission::Granted {
            debug!("Desktop notification skipped, permission not granted");
            return false;
        }
        match notifier.show(notification) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to show desktop notification: {}", e);
                false
            }
        }
    }
}
