use std::sync::Arc;

use super::{FeedbackError, FeedbackKind, FeedbackProvider, Vibrator};

pub fn vibration_pattern(kind: FeedbackKind) -> &'static [u64] {
    match kind {
        FeedbackKind::Like => &[100, 50, 100],
        FeedbackKind::Comment => &[200, 100, 200, 100, 200],
        FeedbackKind::Follow => &[300, 200, 300],
        FeedbackKind::Default => &[150],
    }
}

pub struct Vibration {
    vibrator: Arc<dyn Vibrator>,
}

impl Vibration {
    pub fn new(vibrator: Arc<dyn Vibrator>) -> Self {
        Self { vibrator }
    }
}

impl FeedbackProvider for Vibration {
    fn name(&self) -> &'static str {
        "vibration"
    }

    fn play(&self, kind: FeedbackKind) -> Result<(), FeedbackError> {
        self.vibrator.vibrate(vibration_pattern(kind))
    }
}
