//! 16-bit PCM WAV encoding.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::AudioError;

/// Size of the RIFF header written for mono 16-bit PCM.
pub const WAV_HEADER_LEN: usize = 44;

/// Converts a float sample to 16-bit PCM.
///
/// Samples are clamped to [-1, 1] and scaled by 32767 with rounding.
/// NaN maps to 0.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Encodes mono samples as a little-endian 16-bit PCM WAV stream.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buf = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2));
    let mut writer = WavWriter::new(&mut buf, spec)?;
    for &sample in samples {
        writer.write_sample(quantize(sample))?;
    }
    writer.finalize()?;
    Ok(buf.into_inner())
}
