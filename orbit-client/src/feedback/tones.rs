use std::f32::consts::TAU;
use std::sync::Arc;

use super::{AudioBuffer, AudioOutput, FeedbackError, FeedbackKind, FeedbackProvider};

const ATTACK_SECS: f32 = 0.01;
const DECAY_FLOOR: f32 = 0.001;

/// One sine tone in a plan, offset from the start of the sound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub start_ms: u32,
    pub duration_ms: u32,
    pub volume: f32,
}

const fn tone(frequency: f32, start_ms: u32, duration_ms: u32, volume: f32) -> Tone {
    Tone {
        frequency,
        start_ms,
        duration_ms,
        volume,
    }
}

pub fn tone_plan(kind: FeedbackKind) -> &'static [Tone] {
    const LIKE: [Tone; 2] = [tone(800.0, 0, 150, 0.3), tone(600.0, 120, 150, 0.3)];
    const COMMENT: [Tone; 3] = [
        tone(400.0, 0, 150, 0.25),
        tone(500.0, 80, 150, 0.25),
        tone(600.0, 160, 150, 0.25),
    ];
    const FOLLOW: [Tone; 3] = [
        tone(523.0, 0, 200, 0.3),
        tone(659.0, 100, 200, 0.3),
        tone(784.0, 200, 300, 0.3),
    ];
    const DEFAULT: [Tone; 1] = [tone(600.0, 0, 200, 0.3)];

    match kind {
        FeedbackKind::Like => &LIKE,
        FeedbackKind::Comment => &COMMENT,
        FeedbackKind::Follow => &FOLLOW,
        FeedbackKind::Default => &DEFAULT,
    }
}

/// Gain at `t` seconds into a tone: linear attack, then exponential decay
fn envelope(t: f32, duration: f32, volume: f32) -> f32 {
    if t < ATTACK_SECS {
        return volume * t / ATTACK_SECS;
    }
    let decay = (duration - ATTACK_SECS).max(f32::EPSILON);
    let progress = ((t - ATTACK_SECS) / decay).min(1.0);
    volume * (DECAY_FLOOR / volume).powf(progress)
}

/// Mix every tone of `plan` into one buffer, clamped to `-1.0..=1.0`
pub fn render_plan(plan: &[Tone], sample_rate: u32) -> AudioBuffer {
    let rate = sample_rate as f32;
    let to_samples = |ms: u32| (ms as u64 * sample_rate as u64 / 1000) as usize;
    let total = plan
        .iter()
        .map(|t| to_samples(t.start_ms + t.duration_ms))
        .max()
        .unwrap_or(0);

    let mut samples = vec![0.0f32; total];
    for tone in plan {
        let start = to_samples(tone.start_ms);
        let len = to_samples(tone.duration_ms);
        let duration = tone.duration_ms as f32 / 1000.0;
        for i in 0..len {
            let t = i as f32 / rate;
            samples[start + i] +=
                (TAU * tone.frequency * t).sin() * envelope(t, duration, tone.volume);
        }
    }
    for sample in &mut samples {
        *sample = sample.clamp(-1.0, 1.0);
    }

    AudioBuffer {
        sample_rate,
        samples,
    }
}

pub struct ToneSynth {
    output: Arc<dyn AudioOutput>,
}

impl ToneSynth {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self { output }
    }
}

impl FeedbackProvider for ToneSynth {
    fn name(&self) -> &'static str {
        "tones"
    }

    fn play(&self, kind: FeedbackKind) -> Result<(), FeedbackError> {
        let buffer = render_plan(tone_plan(kind), self.output.sample_rate());
        self.output.play(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::tests::FakeAudio;

    #[test]
    fn test_plans() {
        let like = tone_plan(FeedbackKind::Like);
        assert_eq!(like.len(), 2);
        assert_eq!(like[1].start_ms, 120);

        let follow = tone_plan(FeedbackKind::Follow);
        assert_eq!(
            follow.iter().map(|t| t.frequency).collect::<Vec<_>>(),
            vec![523.0, 659.0, 784.0]
        );
        assert_eq!(follow[2].duration_ms, 300);

        assert_eq!(tone_plan(FeedbackKind::Default), &[tone(600.0, 0, 200, 0.3)]);
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(envelope(0.0, 0.15, 0.3), 0.0);
        assert!((envelope(0.005, 0.15, 0.3) - 0.15).abs() < 1e-6);
        assert!((envelope(0.01, 0.15, 0.3) - 0.3).abs() < 1e-6);
        assert!((envelope(0.15, 0.15, 0.3) - DECAY_FLOOR).abs() < 1e-6);
        assert!(envelope(0.08, 0.15, 0.3) < 0.3);
    }

    #[test]
    fn test_render_length_and_range() {
        // Follow ends at 200 + 300 ms
        let buffer = render_plan(tone_plan(FeedbackKind::Follow), 8000);
        assert_eq!(buffer.samples.len(), 4000);
        assert!(buffer.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(buffer.samples.iter().any(|s| s.abs() > 0.1));
        assert!(render_plan(&[], 8000).samples.is_empty());
    }

    #[test]
    fn test_synth_plays_through_output() {
        let audio = Arc::new(FakeAudio::default());
        let synth = ToneSynth::new(audio.clone());
        synth.play(FeedbackKind::Comment).unwrap();

        let played = audio.played.lock().unwrap();
        assert_eq!(played[0].sample_rate, 8000);
        // Last comment tone ends at 160 + 150 ms
        assert_eq!(played[0].samples.len(), 2480);
    }
}
