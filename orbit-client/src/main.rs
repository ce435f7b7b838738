use std::sync::Arc;

use orbit_client::feedback::{
    initialize_audio, AudioBuffer, AudioOutput, FeedbackChain, FeedbackError, Vibrator,
};
use orbit_client::{ApiClient, ClientConfig, NotificationApi, NotificationSync, SyncSettings};
use orbit_server::WsMessage;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stands in for a sound device by logging what would play
struct LogAudio;

impl AudioOutput for LogAudio {
    fn sample_rate(&self) -> u32 {
        44_100
    }

    fn play(&self, buffer: &AudioBuffer) -> Result<(), FeedbackError> {
        let ms = buffer.samples.len() as u64 * 1000 / buffer.sample_rate.max(1) as u64;
        info!(samples = buffer.samples.len(), ms, "Playing notification sound");
        Ok(())
    }
}

struct LogVibrator;

impl Vibrator for LogVibrator {
    fn vibrate(&self, pattern: &[u64]) -> Result<(), FeedbackError> {
        info!(?pattern, "Vibrating");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env();

    let api = match ApiClient::connect(&config).await {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!("Failed to connect to {}: {}", config.server_url, e);
            std::process::exit(1);
        }
    };

    let audio: Arc<dyn AudioOutput> = Arc::new(LogAudio);
    initialize_audio(audio.as_ref());
    let feedback = FeedbackChain::standard(audio, Arc::new(LogVibrator));

    let notification_api: Arc<dyn NotificationApi> = api.clone();
    let sync = Arc::new(NotificationSync::new(
        notification_api,
        api.user_id(),
        SyncSettings::from(&config),
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let sync_task = tokio::spawn(sync.clone().run(shutdown_tx.subscribe()));

    // Log badge changes
    let mut snapshots = sync.subscribe();
    let mut badge_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        let mut last = None;
        loop {
            tokio::select! {
                _ = badge_shutdown.recv() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let count = snapshots.borrow_and_update().unread_count;
                    if last != Some(count) {
                        info!(unread = count, "Notification badge updated");
                        last = Some(count);
                    }
                }
            }
        }
    });

    // Live pushes
    let mut events = api.subscribe();
    let mut push_shutdown = shutdown_tx.subscribe();
    let push_sync = sync.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = push_shutdown.recv() => break,
                event = events.recv() => match event {
                    Ok(WsMessage::Notification { notification }) => {
                        info!(id = %notification.id, kind = %notification.kind, "New notification");
                        let outcome = feedback.play_for(&notification.kind);
                        if outcome.played_by.is_none() {
                            warn!("No feedback available for notification {}", notification.id);
                        }
                        push_sync.add_new_notification(notification);
                    }
                    Ok(WsMessage::NewMessage { message }) => {
                        info!(from = %message.sender.id, "New chat message");
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Push listener fell behind");
                    }
                    Err(RecvError::Closed) => {
                        warn!("Server connection closed");
                        break;
                    }
                },
            }
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    let _ = shutdown_tx.send(());
    let _ = sync_task.await;
    api.disconnect();
    info!("orbit-watch stopped");
}
