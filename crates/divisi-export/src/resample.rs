//! Offline sample rate conversion using rubato.
//!
//! The offline pass is compute-bound, not wall-clock bound: the whole source
//! buffer is pushed through an FFT resampler in chunks. Channel count and
//! duration are preserved.

use crate::error::{ExportError, Result};
use divisi_core::SampleBuffer;
use rubato::{FftFixedIn, Resampler};

/// Resampling quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleQuality {
    /// Fast resampling (lower quality).
    Fast,
    /// Balanced quality/speed (default).
    #[default]
    Medium,
    /// High quality.
    High,
}

impl ResampleQuality {
    fn chunk_size(&self) -> usize {
        match self {
            ResampleQuality::Fast => 512,
            ResampleQuality::Medium => 1024,
            ResampleQuality::High => 2048,
        }
    }

    fn sub_chunks(&self) -> usize {
        match self {
            ResampleQuality::Fast => 1,
            ResampleQuality::Medium => 2,
            ResampleQuality::High => 4,
        }
    }
}

/// Resample a buffer to `target_rate`.
///
/// Returns the input unchanged when the rates already match.
pub fn resample_buffer(
    source: &SampleBuffer,
    target_rate: u32,
    quality: ResampleQuality,
) -> Result<SampleBuffer> {
    if source.sample_rate == target_rate {
        return Ok(source.clone());
    }
    if source.channels == 0 {
        return Err(ExportError::InvalidData("buffer has no channels".into()));
    }
    if source.samples.len() % source.channels as usize != 0 {
        return Err(ExportError::InvalidData(
            "buffer length is not a whole number of frames".into(),
        ));
    }

    let channels = source.channels as usize;
    let input_frames = source.frames();
    if input_frames == 0 {
        return Ok(SampleBuffer::new(target_rate, source.channels, Vec::new()));
    }

    // Deinterleave into planar channel buffers.
    let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(input_frames); channels];
    for frame in source.samples.chunks_exact(channels) {
        for (ch, &s) in frame.iter().enumerate() {
            planar[ch].push(s);
        }
    }

    let chunk_size = quality.chunk_size();
    let mut resampler = FftFixedIn::<f32>::new(
        source.sample_rate as usize,
        target_rate as usize,
        chunk_size,
        quality.sub_chunks(),
        channels,
    )?;

    let expected_output_frames =
        (input_frames as f64 * target_rate as f64 / source.sample_rate as f64).ceil() as usize;
    let mut output: Vec<Vec<f32>> =
        vec![Vec::with_capacity(expected_output_frames + chunk_size); channels];

    let mut pos = 0;
    while pos < input_frames {
        let remaining = input_frames - pos;
        let needed = resampler.input_frames_next();
        let actual_frames = if remaining < needed {
            needed
        } else {
            remaining.min(chunk_size).max(needed)
        };

        // Zero-pad the tail chunk.
        let copy_frames = actual_frames.min(remaining);
        let mut chunks: Vec<Vec<f32>> = Vec::with_capacity(channels);
        for planar_ch in planar.iter() {
            let mut chunk = vec![0.0f32; actual_frames];
            chunk[..copy_frames].copy_from_slice(&planar_ch[pos..pos + copy_frames]);
            chunks.push(chunk);
        }

        let processed = resampler.process(&chunks, None)?;
        for (ch, data) in processed.into_iter().enumerate() {
            output[ch].extend_from_slice(&data);
        }

        pos += actual_frames;
    }

    let final_frames = expected_output_frames.min(output[0].len());

    // Reinterleave.
    let mut samples = Vec::with_capacity(final_frames * channels);
    for frame in 0..final_frames {
        for planar_ch in output.iter() {
            samples.push(planar_ch[frame]);
        }
    }

    Ok(SampleBuffer::new(target_rate, source.channels, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(sample_rate: u32, channels: u16, frames: usize) -> SampleBuffer {
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for i in 0..frames {
            let v =
                (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32).sin() * 0.5;
            for _ in 0..channels {
                samples.push(v);
            }
        }
        SampleBuffer::new(sample_rate, channels, samples)
    }

    #[test]
    fn test_same_rate_passthrough() {
        let buf = sine_buffer(44_100, 2, 1024);
        let out = resample_buffer(&buf, 44_100, ResampleQuality::Fast).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn test_upsample_preserves_duration_and_channels() {
        let buf = sine_buffer(44_100, 2, 4410); // 0.1s
        let out = resample_buffer(&buf, 48_000, ResampleQuality::Medium).unwrap();

        assert_eq!(out.channels, 2);
        assert_eq!(out.sample_rate, 48_000);
        let expected = (4410.0 * 48_000.0 / 44_100.0) as i64;
        assert!(
            (out.frames() as i64 - expected).abs() < 100,
            "frames {} vs expected {}",
            out.frames(),
            expected
        );
    }

    #[test]
    fn test_downsample_mono() {
        let buf = sine_buffer(96_000, 1, 9600); // 0.1s
        let out = resample_buffer(&buf, 44_100, ResampleQuality::High).unwrap();

        assert_eq!(out.channels, 1);
        let expected = (9600.0 * 44_100.0 / 96_000.0) as i64;
        assert!((out.frames() as i64 - expected).abs() < 100);
    }

    #[test]
    fn test_empty_buffer() {
        let buf = SampleBuffer::new(44_100, 2, Vec::new());
        let out = resample_buffer(&buf, 48_000, ResampleQuality::Fast).unwrap();
        assert!(out.samples.is_empty());
        assert_eq!(out.sample_rate, 48_000);
    }

    #[test]
    fn test_ragged_buffer_rejected() {
        let buf = SampleBuffer::new(44_100, 2, vec![0.0; 3]);
        assert!(resample_buffer(&buf, 48_000, ResampleQuality::Fast).is_err());
    }
}
