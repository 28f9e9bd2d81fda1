//! Concatenation of per-chunk waveforms.

use crate::{encode_wav, AudioError};

/// Audio produced by one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    samples: Vec<f32>,
    sample_rate: u32,
    duration: f64,
}

impl SynthesisResult {
    /// Creates a result from mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, duration: f64) -> Self {
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Creates a result with no audio.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate, 0.0)
    }

    /// Mono samples, nominally in [-1, 1].
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consumes the result and returns the samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total duration in seconds, including inserted silence.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encodes the samples as a 16-bit PCM WAV stream.
    pub fn to_wav(&self) -> Result<Vec<u8>, AudioError> {
        encode_wav(&self.samples, self.sample_rate)
    }
}

/// Number of zero samples inserted for `silence_duration` seconds.
pub fn silence_samples(silence_duration: f64, sample_rate: u32) -> usize {
    (silence_duration * sample_rate as f64).floor().max(0.0) as usize
}

/// Appends chunk waveforms in order, separated by silence.
///
/// The first chunk seeds the result. Every later chunk is preceded by
/// [`silence_samples`] zeros and adds `silence_duration + duration` to the
/// running total.
#[derive(Debug, Clone)]
pub struct AudioAssembler {
    sample_rate: u32,
    silence_duration: f64,
    samples: Vec<f32>,
    duration: f64,
    chunks: usize,
}

impl AudioAssembler {
    pub fn new(sample_rate: u32, silence_duration: f64) -> Self {
        Self {
            sample_rate,
            silence_duration,
            samples: Vec::new(),
            duration: 0.0,
            chunks: 0,
        }
    }

    /// Appends the next chunk.
    pub fn push(&mut self, waveform: &[f32], duration: f64) {
        if self.chunks == 0 {
            self.duration = duration;
        } else {
            let silence = silence_samples(self.silence_duration, self.sample_rate);
            self.samples.resize(self.samples.len() + silence, 0.0);
            self.duration += self.silence_duration + duration;
        }
        self.samples.extend_from_slice(waveform);
        self.chunks += 1;
    }

    /// Number of chunks appended so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn finish(self) -> SynthesisResult {
        SynthesisResult::new(self.samples, self.sample_rate, self.duration)
    }
}

/// Assembles all chunks at once. See [`AudioAssembler`].
pub fn assemble(
    chunk_waveforms: &[Vec<f32>],
    chunk_durations: &[f64],
    silence_duration: f64,
    sample_rate: u32,
) -> Result<SynthesisResult, AudioError> {
    if chunk_waveforms.len() != chunk_durations.len() {
        return Err(AudioError::LengthMismatch {
            waveforms: chunk_waveforms.len(),
            durations: chunk_durations.len(),
        });
    }
    let mut assembler = AudioAssembler::new(sample_rate, silence_duration);
    for (waveform, &duration) in chunk_waveforms.iter().zip(chunk_durations) {
        assembler.push(waveform, duration);
    }
    Ok(assembler.finish())
}
