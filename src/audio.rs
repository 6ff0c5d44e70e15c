use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine as _;

/// Narration is always single-channel at this rate.
pub const SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("narration audio is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("narration audio has an odd byte length ({0}); expected 16-bit samples")]
    OddLength(usize),

    #[error("audio output is busy")]
    DeviceBusy,

    #[error("playback speed must be a positive number, got {0}")]
    InvalidSpeed(f32),
}

/// Decoded narration, samples normalized to `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl PcmClip {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Little-endian f32 samples, the layout `reformat narrate` writes.
    pub fn to_f32_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Decodes base64 signed 16-bit little-endian mono PCM.
pub fn decode_pcm_base64(data: &str) -> Result<PcmClip, AudioError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
    decode_pcm(&bytes)
}

pub fn decode_pcm(bytes: &[u8]) -> Result<PcmClip, AudioError> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::OddLength(bytes.len()));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();
    Ok(PcmClip {
        sample_rate: SAMPLE_RATE,
        samples,
    })
}

/// The single audio output. At most one [`Playback`] holds it at a time.
#[derive(Debug, Clone, Default)]
pub struct AudioOutput {
    busy: Arc<AtomicBool>,
}

impl AudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claims the output for `clip`. The claim ends when the returned handle is
    /// stopped or dropped, whether or not the clip played to the end.
    pub fn play(&self, clip: PcmClip, speed: f32) -> Result<Playback, AudioError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(AudioError::InvalidSpeed(speed));
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AudioError::DeviceBusy);
        }
        tracing::debug!(samples = clip.samples.len(), speed, "audio output acquired");
        Ok(Playback {
            clip,
            speed,
            position: 0,
            busy: Arc::clone(&self.busy),
        })
    }
}

#[derive(Debug)]
pub struct Playback {
    clip: PcmClip,
    speed: f32,
    position: usize,
    busy: Arc<AtomicBool>,
}

impl Playback {
    /// Samples due after `elapsed` wall time at the playback speed.
    pub fn advance(&mut self, elapsed: Duration) -> &[f32] {
        let due = (elapsed.as_secs_f64() * f64::from(self.clip.sample_rate) * f64::from(self.speed))
            .round() as usize;
        let start = self.position;
        let end = start.saturating_add(due).min(self.clip.samples.len());
        self.position = end;
        &self.clip.samples[start..end]
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.clip.samples.len()
    }

    /// Remaining wall time at the playback speed.
    pub fn remaining(&self) -> Duration {
        let left = self.clip.samples.len().saturating_sub(self.position);
        Duration::from_secs_f64(
            left as f64 / (f64::from(self.clip.sample_rate) * f64::from(self.speed)),
        )
    }

    pub fn stop(self) {}
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        tracing::debug!(
            played = self.position,
            total = self.clip.samples.len(),
            "audio output released"
        );
    }
}
