//! Export options.

use crate::resample::ResampleQuality;

/// Target container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Wav,
    /// Accepted by the options surface; encoding fails with `NotImplemented`.
    Mp3,
}

impl AudioFormat {
    /// File extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// PCM bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    #[default]
    Int16,
    Int24,
    Int32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Int32 => 32,
        }
    }

    /// Bytes per sample.
    pub fn bytes(&self) -> u16 {
        self.bits() / 8
    }
}

/// Options for an export pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportOptions {
    /// Container format.
    pub format: AudioFormat,
    /// Capture bound in seconds. `None` runs until an explicit stop.
    pub duration: Option<f64>,
    /// Target sample rate (None = keep the capture rate).
    pub sample_rate: Option<u32>,
    /// PCM bit depth.
    pub bit_depth: BitDepth,
    /// Resampling quality.
    pub resample_quality: ResampleQuality,
}

impl ExportOptions {
    pub fn wav() -> Self {
        Self {
            format: AudioFormat::Wav,
            ..Default::default()
        }
    }

    /// Whether resampling is needed for a capture at `source_rate`.
    pub fn needs_resampling(&self, source_rate: u32) -> bool {
        self.sample_rate.map(|r| r != source_rate).unwrap_or(false)
    }

    /// Effective output rate for a capture at `source_rate`.
    pub fn output_sample_rate(&self, source_rate: u32) -> u32 {
        self.sample_rate.unwrap_or(source_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_resampling() {
        let mut options = ExportOptions::wav();
        assert!(!options.needs_resampling(44_100));

        options.sample_rate = Some(44_100);
        assert!(!options.needs_resampling(44_100));

        options.sample_rate = Some(48_000);
        assert!(options.needs_resampling(44_100));
        assert_eq!(options.output_sample_rate(44_100), 48_000);
    }

    #[test]
    fn test_bit_depth_sizes() {
        assert_eq!(BitDepth::Int16.bytes(), 2);
        assert_eq!(BitDepth::Int24.bytes(), 3);
        assert_eq!(BitDepth::Int32.bytes(), 4);
    }
}
