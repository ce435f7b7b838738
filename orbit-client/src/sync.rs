//! Keeps the notification store in step with the server.
//!
//! The primary query (full notification list) and the backup unread-count
//! query poll on independent timers. Both draw sequence numbers from the
//! same counter so the store can discard whichever response is older.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orbit_server::models::Notification;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::store::{Action, NotificationState};

/// Floor for poll timers; `interval` rejects a zero period
const MIN_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Notification operations the client consumes
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn user_notifications(&self, user_id: &str) -> ClientResult<Vec<Notification>>;

    async fn unread_notifications_count(&self, user_id: &str) -> ClientResult<i64>;

    async fn mark_notifications_as_read(&self, user_id: &str) -> ClientResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub backup_poll_interval: Duration,
    pub resync_delay: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for SyncSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            backup_poll_interval: config.backup_poll_interval,
            resync_delay: config.resync_delay,
        }
    }
}

pub struct NotificationSync {
    api: Arc<dyn NotificationApi>,
    user_id: String,
    settings: SyncSettings,
    state: Mutex<NotificationState>,
    seq: AtomicU64,
    snapshot_tx: watch::Sender<NotificationState>,
}

impl NotificationSync {
    pub fn new(api: Arc<dyn NotificationApi>, user_id: impl Into<String>, settings: SyncSettings) -> Self {
        let (snapshot_tx, _) = watch::channel(NotificationState::default());
        Self {
            api,
            user_id: user_id.into(),
            settings,
            state: Mutex::new(NotificationState::default()),
            seq: AtomicU64::new(0),
            snapshot_tx,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Receive a fresh snapshot every time the visible state changes
    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> NotificationState {
        self.snapshot_tx.borrow().clone()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn dispatch(&self, action: Action) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.reduce(action) {
            self.snapshot_tx.send_replace(state.clone());
        }
    }

    /// Fetch the notification list; returns whether the request succeeded
    pub async fn poll_primary(&self) -> bool {
        let seq = self.next_seq();
        match self.api.user_notifications(&self.user_id).await {
            Ok(notifications) => {
                debug!(seq, count = notifications.len(), "Notifications poll succeeded");
                self.dispatch(Action::PollSuccess { seq, notifications });
                true
            }
            Err(e) => {
                warn!(seq, "Notifications poll failed: {}", e);
                self.dispatch(Action::PollFailed { seq });
                false
            }
        }
    }

    /// Fetch the backup unread count; returns whether the request succeeded
    pub async fn poll_backup(&self) -> bool {
        let seq = self.next_seq();
        match self.api.unread_notifications_count(&self.user_id).await {
            Ok(count) => {
                debug!(seq, count, "Unread count poll succeeded");
                self.dispatch(Action::BackupCount {
                    seq,
                    count: count.max(0) as usize,
                });
                true
            }
            Err(e) => {
                warn!(seq, "Unread count poll failed: {}", e);
                self.dispatch(Action::PollFailed { seq });
                false
            }
        }
    }

    /// Refetch the badge, falling back to the backup count
    pub async fn refresh_unread_count(&self) {
        if self.poll_primary().await {
            return;
        }
        if !self.poll_backup().await {
            warn!("Both unread count sources failed, keeping current badge");
        }
    }

    /// Zero the badge now, tell the server, then resync after a short delay.
    ///
    /// A second barrier is raised once the mutation returns, so polls that
    /// were in flight alongside it cannot restore the pre-mark count. The
    /// returned handle finishes once the delayed resync has run.
    pub async fn mark_as_read(self: &Arc<Self>) -> JoinHandle<()> {
        let barrier = self.next_seq();
        self.dispatch(Action::MarkRead { barrier });

        match self.api.mark_notifications_as_read(&self.user_id).await {
            Ok(_) => debug!(user_id = %self.user_id, "Marked notifications read"),
            Err(e) => warn!(user_id = %self.user_id, "Failed to mark notifications read: {}", e),
        }
        let barrier = self.next_seq();
        self.dispatch(Action::MarkRead { barrier });

        let sync = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(sync.settings.resync_delay).await;
            sync.refresh_unread_count().await;
        })
    }

    pub fn add_new_notification(&self, notification: Notification) {
        self.dispatch(Action::AddNotification(notification));
    }

    pub fn remove_notification(&self, id: &str) {
        self.dispatch(Action::RemoveNotification(id.to_string()));
    }

    pub fn clear_all_notifications(&self) {
        self.dispatch(Action::ClearNotifications);
    }

    pub fn increment_unread(&self) {
        self.dispatch(Action::Increment);
    }

    /// Poll both sources until `shutdown` fires
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut primary = interval(self.settings.poll_interval.max(MIN_POLL_PERIOD));
        primary.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let backup_period = self.settings.backup_poll_interval.max(MIN_POLL_PERIOD);
        let mut backup = interval_at(Instant::now() + backup_period, backup_period);
        backup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(user_id = %self.user_id, "Notification sync started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping notification sync");
                    break;
                }
                _ = primary.tick() => {
                    self.poll_primary().await;
                }
                _ = backup.tick() => {
                    self.poll_backup().await;
                }
            }
        }
    }
}

/// What UI code holds; works the same whether or not a sync is mounted
#[derive(Clone)]
pub enum NotificationHandle {
    Attached(Arc<NotificationSync>),
    Detached,
}

impl NotificationHandle {
    pub fn detached() -> Self {
        NotificationHandle::Detached
    }

    pub fn unread_count(&self) -> usize {
        match self {
            NotificationHandle::Attached(sync) => sync.snapshot().unread_count,
            NotificationHandle::Detached => 0,
        }
    }

    pub fn new_notifications(&self) -> Vec<Notification> {
        match self {
            NotificationHandle::Attached(sync) => sync.snapshot().new_notifications,
            NotificationHandle::Detached => Vec::new(),
        }
    }

    pub async fn mark_as_read(&self) {
        if let NotificationHandle::Attached(sync) = self {
            let _ = sync.mark_as_read().await;
        }
    }

    pub async fn refresh_unread_count(&self) {
        if let NotificationHandle::Attached(sync) = self {
            sync.refresh_unread_count().await;
        }
    }

    pub fn add_new_notification(&self, notification: Notification) {
        if let NotificationHandle::Attached(sync) = self {
            sync.add_new_notification(notification);
        }
    }

    pub fn remove_notification(&self, id: &str) {
        if let NotificationHandle::Attached(sync) = self {
            sync.remove_notification(id);
        }
    }

    pub fn clear_all_notifications(&self) {
        if let NotificationHandle::Attached(sync) = self {
            sync.clear_all_notifications();
        }
    }
}

impl Default for NotificationHandle {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::store::tests::notification;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Scripted API: each call pops the next canned result
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub lists: Mutex<VecDeque<ClientResult<Vec<Notification>>>>,
        pub counts: Mutex<VecDeque<ClientResult<i64>>>,
        pub mark_fails: bool,
        pub marks: AtomicUsize,
        /// When set, the mark mutation waits for a permit
        pub mark_gate: Option<Arc<Notify>>,
    }

    fn offline() -> ClientError {
        ClientError::Disconnected
    }

    #[async_trait]
    impl NotificationApi for FakeApi {
        async fn user_notifications(&self, _user_id: &str) -> ClientResult<Vec<Notification>> {
            self.lists.lock().unwrap().pop_front().unwrap_or_else(|| Err(offline()))
        }

        async fn unread_notifications_count(&self, _user_id: &str) -> ClientResult<i64> {
            self.counts.lock().unwrap().pop_front().unwrap_or_else(|| Err(offline()))
        }

        async fn mark_notifications_as_read(&self, _user_id: &str) -> ClientResult<bool> {
            self.marks.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.mark_gate {
                gate.notified().await;
            }
            if self.mark_fails {
                Err(offline())
            } else {
                Ok(true)
            }
        }
    }

    fn settings() -> SyncSettings {
        SyncSettings {
            poll_interval: Duration::from_millis(50),
            backup_poll_interval: Duration::from_millis(100),
            resync_delay: Duration::from_millis(10),
        }
    }

    fn sync_with(api: FakeApi) -> (Arc<FakeApi>, Arc<NotificationSync>) {
        let api = Arc::new(api);
        let sync = Arc::new(NotificationSync::new(api.clone(), "me", settings()));
        (api, sync)
    }

    #[tokio::test]
    async fn test_refresh_uses_primary() {
        let api = FakeApi::default();
        api.lists.lock().unwrap().push_back(Ok(vec![
            notification("1", "like", false),
            notification("2", "follow", false),
        ]));
        let (_, sync) = sync_with(api);

        sync.refresh_unread_count().await;
        assert_eq!(sync.snapshot().unread_count, 1);
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_backup_then_keeps_badge() {
        let api = FakeApi::default();
        api.counts.lock().unwrap().push_back(Ok(3));
        let (_, sync) = sync_with(api);

        sync.refresh_unread_count().await;
        assert_eq!(sync.snapshot().unread_count, 3);

        // Both sources now fail
        sync.refresh_unread_count().await;
        assert_eq!(sync.snapshot().unread_count, 3);
    }

    #[tokio::test]
    async fn test_mark_as_read_zeroes_even_when_mutation_fails() {
        let api = FakeApi {
            mark_fails: true,
            ..FakeApi::default()
        };
        api.counts.lock().unwrap().push_back(Ok(5));
        let (api, sync) = sync_with(api);
        sync.poll_backup().await;
        assert_eq!(sync.snapshot().unread_count, 5);

        // Resync will fail on both sources, leaving the optimistic zero
        let resync = sync.mark_as_read().await;
        assert_eq!(sync.snapshot().unread_count, 0);
        resync.await.unwrap();

        assert_eq!(sync.snapshot().unread_count, 0);
        assert_eq!(api.marks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mark_as_read_resyncs_from_server() {
        let api = FakeApi::default();
        api.lists
            .lock()
            .unwrap()
            .push_back(Ok(vec![notification("9", "comment", false)]));
        let (_, sync) = sync_with(api);
        sync.increment_unread();

        let resync = sync.mark_as_read().await;
        resync.await.unwrap();

        // A comment arrived after the mark, the resync picks it up
        assert_eq!(sync.snapshot().unread_count, 1);
    }

    #[tokio::test]
    async fn test_snapshots_are_published() {
        let (_, sync) = sync_with(FakeApi::default());
        let mut rx = sync.subscribe();

        sync.add_new_notification(notification("1", "like", false));
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.unread_count, 1);
        assert_eq!(state.new_notifications.len(), 1);

        sync.remove_notification("1");
        rx.changed().await.unwrap();
        assert!(rx.borrow().new_notifications.is_empty());
    }

    #[tokio::test]
    async fn test_run_polls_until_shutdown() {
        let api = FakeApi::default();
        for _ in 0..10 {
            api.lists
                .lock()
                .unwrap()
                .push_back(Ok(vec![notification("1", "like", false)]));
        }
        let (_, sync) = sync_with(api);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(sync.clone().run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sync.snapshot().unread_count, 1);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_poll_during_mark_cannot_restore_badge() {
        let gate = Arc::new(Notify::new());
        let api = FakeApi {
            mark_gate: Some(gate.clone()),
            ..FakeApi::default()
        };
        // Server state read before the mark lands
        api.lists
            .lock()
            .unwrap()
            .push_back(Ok(vec![notification("1", "like", false)]));
        let (api, sync) = sync_with(api);

        let marking = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.mark_as_read().await })
        };
        while api.marks.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(sync.poll_primary().await);
        assert_eq!(sync.snapshot().unread_count, 1);

        gate.notify_one();
        let resync = marking.await.unwrap();
        assert_eq!(sync.snapshot().unread_count, 0);
        resync.await.unwrap();
        assert_eq!(sync.snapshot().unread_count, 0);
    }

    #[tokio::test]
    async fn test_run_survives_zero_intervals() {
        let api = FakeApi::default();
        api.lists
            .lock()
            .unwrap()
            .push_back(Ok(vec![notification("1", "comment", false)]));
        let sync = Arc::new(NotificationSync::new(
            Arc::new(api),
            "me",
            SyncSettings {
                poll_interval: Duration::ZERO,
                backup_poll_interval: Duration::ZERO,
                resync_delay: Duration::ZERO,
            },
        ));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(sync.clone().run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sync.snapshot().unread_count, 1);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_detached_handle_is_inert() {
        let handle = NotificationHandle::detached();
        handle.add_new_notification(notification("1", "like", false));
        handle.mark_as_read().await;
        handle.refresh_unread_count().await;
        assert_eq!(handle.unread_count(), 0);
        assert!(handle.new_notifications().is_empty());
    }
}
