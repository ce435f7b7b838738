//! Best-effort sound and haptic feedback for incoming notifications.
//!
//! Providers are tried in order until one succeeds: synthesized tones,
//! then an embedded clip, then vibration. Failures are logged and never
//! reach the caller.

mod clip;
mod desktop;
mod tones;
mod vibration;

pub use clip::{decode_wav, ClipPlayer, WavClip, NOTIFY_CLIP};
pub use desktop::{DesktopNotification, DesktopNotifications, DesktopNotifier, Permission};
pub use tones::{render_plan, tone_plan, Tone, ToneSynth};
pub use vibration::{vibration_pattern, Vibration};

use std::sync::Arc;

use orbit_server::models::NotificationKind;
use tracing::{debug, error, warn};

/// Sound family for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Like,
    Comment,
    Follow,
    Default,
}

impl From<&NotificationKind> for FeedbackKind {
    fn from(kind: &NotificationKind) -> Self {
        match kind {
            NotificationKind::Like => FeedbackKind::Like,
            NotificationKind::Comment => FeedbackKind::Comment,
            NotificationKind::Follow => FeedbackKind::Follow,
            NotificationKind::CommentLike | NotificationKind::Other(_) => FeedbackKind::Default,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Invalid audio clip: {0}")]
    InvalidClip(String),
}

/// Mono PCM samples in `-1.0..=1.0`
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Sound device the tone and clip tiers play through
pub trait AudioOutput: Send + Sync {
    /// Preferred sample rate for synthesized buffers
    fn sample_rate(&self) -> u32;

    fn play(&self, buffer: &AudioBuffer) -> Result<(), FeedbackError>;
}

/// Haptic motor; patterns alternate vibrate/pause durations in milliseconds
pub trait Vibrator: Send + Sync {
    fn vibrate(&self, pattern: &[u64]) -> Result<(), FeedbackError>;
}

pub trait FeedbackProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn play(&self, kind: FeedbackKind) -> Result<(), FeedbackError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackOutcome {
    pub played_by: Option<&'static str>,
    pub failures: Vec<(&'static str, String)>,
}

#[derive(Default)]
pub struct FeedbackChain {
    providers: Vec<Box<dyn FeedbackProvider>>,
}

impl FeedbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl FeedbackProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Tones, then the embedded clip, then vibration
    pub fn standard(audio: Arc<dyn AudioOutput>, vibrator: Arc<dyn Vibrator>) -> Self {
        Self::new()
            .with(ToneSynth::new(audio.clone()))
            .with(ClipPlayer::new(audio))
            .with(Vibration::new(vibrator))
    }

    pub fn play(&self, kind: FeedbackKind) -> FeedbackOutcome {
        let mut outcome = FeedbackOutcome::default();
        for provider in &self.providers {
            match provider.play(kind) {
                Ok(()) => {
                    debug!(provider = provider.name(), ?kind, "Feedback played");
                    outcome.played_by = Some(provider.name());
                    return outcome;
                }
                Err(e) => {
                    warn!(provider = provider.name(), "Feedback tier failed: {}", e);
                    outcome.failures.push((provider.name(), e.to_string()));
                }
            }
        }
        error!(?kind, "All feedback methods failed");
        outcome
    }

    pub fn play_for(&self, kind: &NotificationKind) -> FeedbackOutcome {
        self.play(FeedbackKind::from(kind))
    }
}

/// Prime `output` with 10 ms of silence; returns whether it accepted it
pub fn initialize_audio(output: &dyn AudioOutput) -> bool {
    let sample_rate = output.sample_rate();
    let buffer = AudioBuffer {
        sample_rate,
        samples: vec![0.0; (sample_rate / 100) as usize],
    };
    match output.play(&buffer) {
        Ok(()) => {
            debug!("Audio output initialized");
            true
        }
        Err(e) => {
            warn!("Audio initialization failed: {}", e);
            false
        }
    }
}
