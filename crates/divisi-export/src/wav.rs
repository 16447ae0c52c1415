//! WAV encoding using hound.
//!
//! The container is the standard 44-byte RIFF/WAVE/fmt/data PCM layout.
//! Quantization uses asymmetric positive/negative scaling so the full
//! two's-complement range is reached exactly: a float of -1.0 maps to the
//! most negative integer, +1.0 to the most positive.

use crate::error::Result;
use crate::options::BitDepth;
use divisi_core::SampleBuffer;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;

/// Encode a buffer to WAV bytes in memory.
pub fn encode_wav_memory(buffer: &SampleBuffer, bit_depth: BitDepth) -> Result<Vec<u8>> {
    let spec = wav_spec(buffer, bit_depth);
    let mut bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut bytes);
        let mut writer = WavWriter::new(cursor, spec)?;
        write_samples(&mut writer, &buffer.samples, bit_depth)?;
        writer.finalize()?;
    }
    Ok(bytes)
}

/// Encode a buffer to a WAV file.
pub fn encode_wav_file(buffer: &SampleBuffer, path: &Path, bit_depth: BitDepth) -> Result<()> {
    let spec = wav_spec(buffer, bit_depth);
    let mut writer = WavWriter::create(path, spec)?;
    write_samples(&mut writer, &buffer.samples, bit_depth)?;
    writer.finalize()?;
    Ok(())
}

fn wav_spec(buffer: &SampleBuffer, bit_depth: BitDepth) -> WavSpec {
    WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth.bits(),
        sample_format: SampleFormat::Int,
    }
}

fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    bit_depth: BitDepth,
) -> Result<()> {
    match bit_depth {
        BitDepth::Int16 => {
            for &s in samples {
                writer.write_sample(quantize_i16(s))?;
            }
        }
        BitDepth::Int24 => {
            for &s in samples {
                writer.write_sample(quantize_i24(s))?;
            }
        }
        BitDepth::Int32 => {
            for &s in samples {
                writer.write_sample(quantize_i32(s))?;
            }
        }
    }
    Ok(())
}

/// Clamp to [-1, 1] and scale to the 16-bit range, split by sign.
#[inline]
pub fn quantize_i16(sample: f32) -> i16 {
    let c = sample.clamp(-1.0, 1.0);
    if c >= 0.0 {
        (c * 32767.0) as i16
    } else {
        (c * 32768.0) as i16
    }
}

/// Clamp to [-1, 1] and scale to the 24-bit range, split by sign.
#[inline]
pub fn quantize_i24(sample: f32) -> i32 {
    let c = sample.clamp(-1.0, 1.0);
    if c >= 0.0 {
        (c as f64 * 8_388_607.0) as i32
    } else {
        (c as f64 * 8_388_608.0) as i32
    }
}

/// Clamp to [-1, 1] and scale to the 32-bit range, split by sign.
#[inline]
pub fn quantize_i32(sample: f32) -> i32 {
    let c = sample.clamp(-1.0, 1.0) as f64;
    if c >= 0.0 {
        (c * 2_147_483_647.0) as i32
    } else {
        (c * 2_147_483_648.0) as i32
    }
}
