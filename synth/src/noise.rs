//! Initial latent noise for the denoising loop.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{ModelConfig, Tensor, TensorError};

/// Gaussian latent and its mask for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentNoise {
    /// `[batch, latent_channels, frames]`.
    pub latent: Tensor,
    /// `[batch, 1, frames]`, 1.0 for frames inside each row's length.
    pub mask: Tensor,
    /// Valid frame count per row.
    pub lengths: Vec<usize>,
}

/// Upper bound on the element count of a sampled latent.
pub const MAX_LATENT_ELEMENTS: usize = 1 << 28;

/// Number of latent frames needed for `duration` seconds of audio.
///
/// Durations under one sample give zero frames.
pub fn latent_length(duration: f32, config: &ModelConfig) -> usize {
    let wav_len = (duration as f64 * config.sample_rate as f64).floor().max(0.0) as usize;
    wav_len.div_ceil(config.chunk_size())
}

/// Draws standard-normal latents.
#[derive(Debug)]
pub struct NoiseSampler {
    rng: StdRng,
}

impl NoiseSampler {
    /// Seeded samplers produce identical noise for identical inputs.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// One standard-normal draw via the Box-Muller transform.
    pub fn standard_normal(&mut self) -> f32 {
        let u1 = self.rng.r#gen::<f64>().max(1e-10);
        let u2 = self.rng.r#gen::<f64>();
        ((-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()) as f32
    }

    /// Samples a latent sized for the given per-row durations (seconds).
    ///
    /// Frames past a row's own length are zero in both the latent and the
    /// mask.
    pub fn sample(
        &mut self,
        durations: &[f32],
        config: &ModelConfig,
    ) -> Result<LatentNoise, TensorError> {
        let batch = durations.len();
        let channels = config.latent_channels();
        let lengths: Vec<usize> = durations.iter().map(|&d| latent_length(d, config)).collect();
        let frames = lengths.iter().copied().max().unwrap_or(0);
        let shape = [batch, channels, frames];
        let elements = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .filter(|&n| n <= MAX_LATENT_ELEMENTS)
            .ok_or_else(|| TensorError::TooLarge {
                shape: shape.to_vec(),
                limit: MAX_LATENT_ELEMENTS,
            })?;

        let mut latent = Vec::with_capacity(elements);
        let mut mask = Vec::with_capacity(batch * frames);
        for &len in &lengths {
            for _ in 0..channels {
                for t in 0..frames {
                    let z = self.standard_normal();
                    latent.push(if t < len { z } else { 0.0 });
                }
            }
            mask.extend((0..frames).map(|t| if t < len { 1.0 } else { 0.0 }));
        }

        Ok(LatentNoise {
            latent: Tensor::from_f32(shape, latent)?,
            mask: Tensor::from_f32([batch, 1, frames], mask)?,
            lengths,
        })
    }
}
