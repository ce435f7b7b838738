use std::sync::Arc;

use super::{AudioBuffer, AudioOutput, FeedbackError, FeedbackKind, FeedbackProvider};

/// Short notification blip played when tone synthesis is unavailable
pub static NOTIFY_CLIP: &[u8] = include_bytes!("../../assets/notify.wav");

const CLIP_VOLUME: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct WavClip {
    pub sample_rate: u32,
    pub channels: u16,
    /// Mono mixdown in `-1.0..=1.0`
    pub samples: Vec<f32>,
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

/// Decode 8- or 16-bit PCM WAV data
pub fn decode_wav(bytes: &[u8]) -> Result<WavClip, FeedbackError> {
    let invalid = |msg: &str| FeedbackError::InvalidClip(msg.to_string());

    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(invalid("missing RIFF/WAVE header"));
    }

    let mut format: Option<(u16, u16, u32, u16)> = None;
    let mut data: Option<&[u8]> = None;
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = read_u32(bytes, offset + 4).ok_or_else(|| invalid("truncated chunk"))? as usize;
        let body_start = offset + 8;
        let body = bytes
            .get(body_start..body_start + size)
            .ok_or_else(|| invalid("chunk runs past end of file"))?;

        match id {
            b"fmt " => {
                let field = |at| read_u16(body, at).ok_or_else(|| invalid("short fmt chunk"));
                let sample_rate = read_u32(body, 4).ok_or_else(|| invalid("short fmt chunk"))?;
                format = Some((field(0)?, field(2)?, sample_rate, field(14)?));
            }
            b"data" => data = Some(body),
            _ => {}
        }
        // Chunks are word aligned
        offset = body_start + size + (size & 1);
    }

    let (audio_format, channels, sample_rate, bits) = format.ok_or_else(|| invalid("no fmt chunk"))?;
    let data = data.ok_or_else(|| invalid("no data chunk"))?;
    if audio_format != 1 {
        return Err(invalid("only PCM is supported"));
    }
    if channels == 0 {
        return Err(invalid("zero channels"));
    }

    let per_channel: Vec<f32> = match bits {
        8 => data.iter().map(|b| (*b as f32 - 128.0) / 128.0).collect(),
        16 => data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect(),
        _ => return Err(invalid("unsupported bit depth")),
    };
    let samples = per_channel
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(WavClip {
        sample_rate,
        channels,
        samples,
    })
}

pub struct ClipPlayer {
    output: Arc<dyn AudioOutput>,
    clip: &'static [u8],
}

impl ClipPlayer {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self::with_clip(output, NOTIFY_CLIP)
    }

    pub fn with_clip(output: Arc<dyn AudioOutput>, clip: &'static [u8]) -> Self {
        Self { output, clip }
    }
}

impl FeedbackProvider for ClipPlayer {
    fn name(&self) -> &'static str {
        "clip"
    }

    /// The same clip plays for every kind
    fn play(&self, _kind: FeedbackKind) -> Result<(), FeedbackError> {
        let clip = decode_wav(self.clip)?;
        let buffer = AudioBuffer {
            sample_rate: clip.sample_rate,
            samples: clip.samples.iter().map(|s| s * CLIP_VOLUME).collect(),
        };
        self.output.play(&buffer)
    }
}
