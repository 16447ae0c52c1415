//! Offline export for the divisi mixing engine.
//!
//! Turns a decoded capture into an encoded file: an optional compute-bound
//! resampling pass followed by PCM container encoding. WAV is supported;
//! MP3 is accepted by the options surface but fails with `NotImplemented`.

pub mod error;
pub use error::{ExportError, Result};

mod options;
pub use options::{AudioFormat, BitDepth, ExportOptions};

mod resample;
pub use resample::{resample_buffer, ResampleQuality};

mod wav;
pub use wav::{encode_wav_file, encode_wav_memory, quantize_i16, quantize_i24, quantize_i32};

use divisi_core::SampleBuffer;
use std::path::Path;

/// Encode a decoded capture according to `options`, in memory.
///
/// Resamples first when the target rate differs from the buffer's rate.
pub fn encode(buffer: &SampleBuffer, options: &ExportOptions) -> Result<Vec<u8>> {
    let processed = prepare(buffer, options)?;
    match options.format {
        AudioFormat::Wav => encode_wav_memory(&processed, options.bit_depth),
        AudioFormat::Mp3 => Err(ExportError::NotImplemented("mp3 encoding".into())),
    }
}

/// Encode a decoded capture according to `options`, writing to `path`.
pub fn encode_to_file(buffer: &SampleBuffer, options: &ExportOptions, path: &Path) -> Result<()> {
    let processed = prepare(buffer, options)?;
    match options.format {
        AudioFormat::Wav => encode_wav_file(&processed, path, options.bit_depth),
        AudioFormat::Mp3 => Err(ExportError::NotImplemented("mp3 encoding".into())),
    }
}

fn prepare(buffer: &SampleBuffer, options: &ExportOptions) -> Result<SampleBuffer> {
    if options.needs_resampling(buffer.sample_rate) {
        let target = options.output_sample_rate(buffer.sample_rate);
        log::debug!(
            "resampling {} -> {} Hz ({} frames)",
            buffer.sample_rate,
            target,
            buffer.frames()
        );
        resample_buffer(buffer, target, options.resample_quality)
    } else {
        Ok(buffer.clone())
    }
}
