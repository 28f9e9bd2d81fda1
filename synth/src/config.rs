//! Per-call synthesis settings and model geometry.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SynthError;

/// Settings supplied with every synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Denoising iterations per chunk. Zero vocodes the initial noise.
    pub denoising_steps: usize,
    /// Speaking rate; predicted durations are divided by it.
    pub speech_speed: f32,
    /// Pause inserted between chunks, in seconds.
    pub silence_duration: f64,
    /// Seeds the noise sampler for reproducible output.
    pub seed: Option<u64>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            denoising_steps: 5,
            speech_speed: 1.05,
            silence_duration: 0.3,
            seed: None,
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> Result<(), SynthError> {
        if !self.speech_speed.is_finite() || self.speech_speed <= 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "speech_speed must be a positive number, got {}",
                self.speech_speed
            )));
        }
        if !self.silence_duration.is_finite() || self.silence_duration < 0.0 {
            return Err(SynthError::InvalidConfiguration(format!(
                "silence_duration must be a non-negative number, got {}",
                self.silence_duration
            )));
        }
        Ok(())
    }
}

/// Geometry of the trained models, read from `tts.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    pub sample_rate: u32,
    pub base_chunk_size: usize,
    pub chunk_compress_factor: usize,
    pub latent_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            base_chunk_size: 512,
            chunk_compress_factor: 2,
            latent_dim: 512,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TtsFile {
    #[serde(default)]
    ae: AeSection,
    #[serde(default)]
    ttl: TtlSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AeSection {
    sample_rate: u32,
    base_chunk_size: usize,
}

impl Default for AeSection {
    fn default() -> Self {
        let d = ModelConfig::default();
        Self {
            sample_rate: d.sample_rate,
            base_chunk_size: d.base_chunk_size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TtlSection {
    chunk_compress_factor: usize,
    latent_dim: usize,
}

impl Default for TtlSection {
    fn default() -> Self {
        let d = ModelConfig::default();
        Self {
            chunk_compress_factor: d.chunk_compress_factor,
            latent_dim: d.latent_dim,
        }
    }
}

impl ModelConfig {
    /// Parses the `{"ae": {..}, "ttl": {..}}` layout. Other keys are ignored.
    pub fn from_json(data: &[u8]) -> Result<Self, SynthError> {
        let file: TtsFile =
            serde_json::from_slice(data).map_err(|e| SynthError::asset("tts.json", e))?;
        let config = Self {
            sample_rate: file.ae.sample_rate,
            base_chunk_size: file.ae.base_chunk_size,
            chunk_compress_factor: file.ttl.chunk_compress_factor,
            latent_dim: file.ttl.latent_dim,
        };
        config.check()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SynthError> {
        let path = path.as_ref();
        let data =
            std::fs::read(path).map_err(|e| SynthError::asset(path.display().to_string(), e))?;
        Self::from_json(&data)
    }

    /// Waveform samples per latent frame.
    pub fn chunk_size(&self) -> usize {
        self.base_chunk_size * self.chunk_compress_factor
    }

    /// Channel count of the latent.
    pub fn latent_channels(&self) -> usize {
        self.latent_dim * self.chunk_compress_factor
    }

    fn check(&self) -> Result<(), SynthError> {
        if self.sample_rate == 0
            || self.base_chunk_size == 0
            || self.chunk_compress_factor == 0
            || self.latent_dim == 0
        {
            return Err(SynthError::asset(
                "tts.json",
                format!("model dimensions must be non-zero: {self:?}"),
            ));
        }
        Ok(())
    }
}
