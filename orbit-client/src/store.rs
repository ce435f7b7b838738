//! Notification badge and popup state as an explicit reducer.
//!
//! Every server-derived action carries the sequence number of the request
//! that produced it. Responses are applied in sequence order, never in
//! arrival order, and a mark-as-read raises a barrier that discards every
//! response requested before it.

use orbit_server::models::notification::unread_badge_count;
use orbit_server::models::Notification;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    pub unread_count: usize,
    /// Transient notifications waiting to be shown as popups, oldest first
    pub new_notifications: Vec<Notification>,
    pub last_applied_seq: u64,
    pub read_barrier: u64,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Primary notifications query returned
    PollSuccess {
        seq: u64,
        notifications: Vec<Notification>,
    },
    /// Backup unread-count query returned
    BackupCount { seq: u64, count: usize },
    AddNotification(Notification),
    RemoveNotification(String),
    ClearNotifications,
    Increment,
    MarkRead { barrier: u64 },
    PollFailed { seq: u64 },
}

impl NotificationState {
    fn is_stale(&self, seq: u64) -> bool {
        seq <= self.last_applied_seq || seq < self.read_barrier
    }

    fn set_count(&mut self, seq: u64, count: usize) -> bool {
        self.last_applied_seq = seq;
        let changed = self.unread_count != count;
        self.unread_count = count;
        changed
    }

    /// Apply `action`; returns whether the visible state changed
    pub fn reduce(&mut self, action: Action) -> bool {
        match action {
            Action::PollSuccess { seq, notifications } => {
                if self.is_stale(seq) {
                    return false;
                }
                self.set_count(seq, unread_badge_count(&notifications))
            }
            Action::BackupCount { seq, count } => {
                if self.is_stale(seq) {
                    return false;
                }
                self.set_count(seq, count)
            }
            Action::AddNotification(notification) => {
                match self
                    .new_notifications
                    .iter()
                    .position(|n| n.id == notification.id)
                {
                    Some(index) => {
                        self.new_notifications.remove(index);
                        self.new_notifications.push(notification);
                    }
                    None => {
                        if notification.kind.counts_toward_badge() {
                            self.unread_count += 1;
                        }
                        self.new_notifications.push(notification);
                    }
                }
                true
            }
            Action::RemoveNotification(id) => {
                let before = self.new_notifications.len();
                self.new_notifications.retain(|n| n.id != id);
                self.new_notifications.len() != before
            }
            Action::ClearNotifications => {
                let changed = !self.new_notifications.is_empty();
                self.new_notifications.clear();
                changed
            }
            Action::Increment => {
                self.unread_count += 1;
                true
            }
            Action::MarkRead { barrier } => {
                self.read_barrier = self.read_barrier.max(barrier);
                let changed = self.unread_count != 0;
                self.unread_count = 0;
                changed
            }
            // A failed poll keeps the last known badge
            Action::PollFailed { .. } => false,
        }
    }
}
