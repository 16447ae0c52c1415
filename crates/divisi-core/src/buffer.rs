//! Sample buffers and captured blobs.

/// Interleaved float PCM held in memory.
///
/// Samples are stored frame-interleaved: `[ch0, ch1, ch0, ch1, ...]` for a
/// two-channel buffer. All values are nominally in `[-1.0, 1.0]`; nothing in
/// the engine clamps them before export-time quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    /// A buffer of silence with the given duration.
    pub fn silent(sample_rate: u32, channels: u16, duration_secs: f64) -> Self {
        let frames = (duration_secs * sample_rate as f64).round() as usize;
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

/// Raw captured audio as produced by a capture session.
///
/// The payload is little-endian `f32` interleaved PCM. A blob is the unit
/// handed from capture to decode; it carries its own rate and channel count
/// so a recording survives substrate reconfiguration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlob {
    pub sample_rate: u32,
    pub channels: u16,
    pub data: Vec<u8>,
}

impl AudioBlob {
    /// Pack interleaved samples into a blob.
    pub fn from_samples(sample_rate: u32, channels: u16, samples: &[f32]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 4);
        for s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        Self {
            sample_rate,
            channels,
            data,
        }
    }

    /// Payload length in samples (not frames).
    pub fn sample_len(&self) -> usize {
        self.data.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
