//! Four-stage synthesis of one batch of utterances.
//!
//! A batch moves through typed states, each produced by consuming the
//! previous one:
//!
//! ```text
//! Encoded --(duration predictor || text encoder)--> Conditioned
//!         --noise--> Denoising(0) --vector estimator--> ... Denoising(n)
//!         --vocoder--> Vocoded
//! ```
//!
//! Every model failure is reported as [`SynthError::ModelExecution`] with
//! the [`Stage`] that failed.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use diffvox_text::Encoding;
use tracing::debug;

use crate::{ModelConfig, ModelExecutor, NamedTensors, NoiseSampler, SynthError, Tensor, VoiceStyle};

/// Longest duration, in seconds, accepted for a single batch row.
pub const MAX_ROW_DURATION: f32 = 600.0;

/// A step of the pipeline that runs a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    DurationPredictor,
    TextEncoder,
    VectorEstimator { step: usize },
    Vocoder,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DurationPredictor => f.write_str("duration_predictor"),
            Self::TextEncoder => f.write_str("text_encoder"),
            Self::VectorEstimator { step } => write!(f, "vector_estimator(step {step})"),
            Self::Vocoder => f.write_str("vocoder"),
        }
    }
}

/// The four networks of the pipeline.
#[derive(Clone)]
pub struct Models {
    pub duration_predictor: Arc<dyn ModelExecutor>,
    pub text_encoder: Arc<dyn ModelExecutor>,
    pub vector_estimator: Arc<dyn ModelExecutor>,
    pub vocoder: Arc<dyn ModelExecutor>,
}

/// Audio for one row of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAudio {
    pub samples: Vec<f32>,
    /// Predicted duration in seconds, after speed scaling.
    pub duration: f64,
}

/// Style tensors tiled to the batch size.
#[derive(Debug, Clone)]
struct BatchStyle {
    ttl: Tensor,
    dp: Tensor,
}

async fn run_stage(
    stage: Stage,
    model: &dyn ModelExecutor,
    inputs: NamedTensors,
) -> Result<Tensor, SynthError> {
    let start = Instant::now();
    let outputs = model
        .run(inputs)
        .await
        .map_err(|e| SynthError::model(stage, e))?;
    debug!(stage = %stage, elapsed = ?start.elapsed(), "synth: stage done");
    outputs
        .into_first()
        .ok_or_else(|| SynthError::model(stage, "model produced no outputs"))
}

/// Token ids and text mask of a batch.
#[derive(Debug, Clone)]
pub struct Encoded {
    text_ids: Tensor,
    text_mask: Tensor,
    style: BatchStyle,
    batch: usize,
}

impl Encoded {
    pub fn new(encoding: &Encoding, style: &VoiceStyle) -> Result<Self, SynthError> {
        let batch = encoding.batch_size();
        let len = encoding.max_len();
        let invalid = |e: crate::TensorError| SynthError::InvalidConfiguration(e.to_string());

        let text_ids = Tensor::from_i64([batch, len], encoding.flat_token_ids()).map_err(invalid)?;
        let text_mask = Tensor::from_f32([batch, 1, len], encoding.flat_mask()).map_err(invalid)?;
        let style = BatchStyle {
            ttl: style.ttl().tile_batch(batch).map_err(invalid)?,
            dp: style.dp().tile_batch(batch).map_err(invalid)?,
        };
        Ok(Self {
            text_ids,
            text_mask,
            style,
            batch,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Predicts durations and encodes the text concurrently.
    ///
    /// Durations are divided by `speech_speed` and must then be finite and
    /// at most [`MAX_ROW_DURATION`].
    pub async fn condition(
        self,
        models: &Models,
        speech_speed: f32,
    ) -> Result<Conditioned, SynthError> {
        let dp_inputs = NamedTensors::new()
            .with("text_ids", self.text_ids.clone())
            .with("style_dp", self.style.dp.clone())
            .with("text_mask", self.text_mask.clone());
        let te_inputs = NamedTensors::new()
            .with("text_ids", self.text_ids)
            .with("style_ttl", self.style.ttl.clone())
            .with("text_mask", self.text_mask.clone());

        let (durations, text_emb) = tokio::try_join!(
            run_stage(Stage::DurationPredictor, models.duration_predictor.as_ref(), dp_inputs),
            run_stage(Stage::TextEncoder, models.text_encoder.as_ref(), te_inputs),
        )?;

        let stage = Stage::DurationPredictor;
        let durations = durations.into_f32().map_err(|e| SynthError::model(stage, e))?;
        if durations.len() != self.batch {
            return Err(SynthError::model(
                stage,
                format!("expected {} durations, got {}", self.batch, durations.len()),
            ));
        }
        let durations: Vec<f32> = durations.into_iter().map(|d| d / speech_speed).collect();
        if let Some(bad) = durations
            .iter()
            .find(|d| !d.is_finite() || **d > MAX_ROW_DURATION)
        {
            return Err(SynthError::model(
                stage,
                format!("duration {bad}s at speed {speech_speed} is out of range"),
            ));
        }

        Ok(Conditioned {
            text_mask: self.text_mask,
            text_emb,
            style: self.style,
            durations,
        })
    }
}

/// Durations and text embedding of a batch.
#[derive(Debug, Clone)]
pub struct Conditioned {
    text_mask: Tensor,
    text_emb: Tensor,
    style: BatchStyle,
    durations: Vec<f32>,
}

impl Conditioned {
    /// Predicted per-row durations in seconds.
    pub fn durations(&self) -> &[f32] {
        &self.durations
    }

    /// Samples the initial latent and enters the denoising loop.
    ///
    /// Fails if no row is long enough for a single latent frame.
    pub fn start_denoising(
        self,
        sampler: &mut NoiseSampler,
        config: &ModelConfig,
        total_steps: usize,
    ) -> Result<Denoising, SynthError> {
        let stage = Stage::DurationPredictor;
        let noise = sampler
            .sample(&self.durations, config)
            .map_err(|e| SynthError::model(stage, e))?;
        if noise.lengths.iter().all(|&len| len == 0) {
            return Err(SynthError::model(
                stage,
                format!("durations {:?} are all shorter than one latent frame", self.durations),
            ));
        }
        Ok(Denoising {
            latent: noise.latent,
            latent_mask: noise.mask,
            text_mask: self.text_mask,
            text_emb: self.text_emb,
            style: self.style,
            durations: self.durations,
            step: 0,
            total_steps,
        })
    }
}

/// A latent being refined, `step` of `total_steps` done.
#[derive(Debug, Clone)]
pub struct Denoising {
    latent: Tensor,
    latent_mask: Tensor,
    text_mask: Tensor,
    text_emb: Tensor,
    style: BatchStyle,
    durations: Vec<f32>,
    step: usize,
    total_steps: usize,
}

impl Denoising {
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.step >= self.total_steps
    }

    pub fn latent(&self) -> &Tensor {
        &self.latent
    }

    /// Runs one vector estimator step; its output becomes the new latent.
    pub async fn advance(mut self, models: &Models) -> Result<Self, SynthError> {
        let stage = Stage::VectorEstimator { step: self.step };
        let batch = self.durations.len();
        let inputs = NamedTensors::new()
            .with("noisy_latent", self.latent.clone())
            .with("text_emb", self.text_emb.clone())
            .with("style_ttl", self.style.ttl.clone())
            .with("latent_mask", self.latent_mask.clone())
            .with("text_mask", self.text_mask.clone())
            .with("current_step", Tensor::full_f32([batch], self.step as f32))
            .with("total_step", Tensor::full_f32([batch], self.total_steps as f32));

        let next = run_stage(stage, models.vector_estimator.as_ref(), inputs).await?;
        let data = next.into_f32().map_err(|e| SynthError::model(stage, e))?;
        self.latent = Tensor::from_f32(self.latent.shape().to_vec(), data)
            .map_err(|e| SynthError::model(stage, e))?;
        self.step += 1;
        Ok(self)
    }

    /// Runs the remaining steps.
    pub async fn run(mut self, models: &Models) -> Result<Self, SynthError> {
        while !self.is_done() {
            self = self.advance(models).await?;
        }
        Ok(self)
    }

    /// Decodes the latent to waveforms, one per batch row, each trimmed to
    /// its predicted duration.
    pub async fn vocode(self, models: &Models, sample_rate: u32) -> Result<Vocoded, SynthError> {
        let stage = Stage::Vocoder;
        let inputs = NamedTensors::new().with("latent", self.latent);
        let wav = run_stage(stage, models.vocoder.as_ref(), inputs)
            .await?
            .into_f32()
            .map_err(|e| SynthError::model(stage, e))?;

        let batch = self.durations.len();
        if batch == 0 || wav.len() % batch != 0 {
            return Err(SynthError::model(
                stage,
                format!("{} samples do not split into {batch} rows", wav.len()),
            ));
        }
        let row_len = wav.len() / batch;
        let chunks = self
            .durations
            .iter()
            .enumerate()
            .map(|(i, &duration)| {
                let row = &wav[i * row_len..(i + 1) * row_len];
                let duration = duration.max(0.0) as f64;
                let keep = ((sample_rate as f64 * duration).floor() as usize).min(row.len());
                ChunkAudio {
                    samples: row[..keep].to_vec(),
                    duration,
                }
            })
            .collect();
        Ok(Vocoded { chunks })
    }
}

/// Waveforms of a finished batch.
#[derive(Debug, Clone)]
pub struct Vocoded {
    chunks: Vec<ChunkAudio>,
}

impl Vocoded {
    pub fn into_chunks(self) -> Vec<ChunkAudio> {
        self.chunks
    }
}

/// Runs the whole pipeline for one encoded batch.
pub async fn synthesize_batch(
    models: &Models,
    model_config: &ModelConfig,
    style: &VoiceStyle,
    encoding: &Encoding,
    sampler: &mut NoiseSampler,
    denoising_steps: usize,
    speech_speed: f32,
) -> Result<Vec<ChunkAudio>, SynthError> {
    let encoded = Encoded::new(encoding, style)?;
    let conditioned = encoded.condition(models, speech_speed).await?;
    debug!(durations = ?conditioned.durations(), "synth: durations predicted");
    let denoised = conditioned
        .start_denoising(sampler, model_config, denoising_steps)?
        .run(models)
        .await?;
    let vocoded = denoised.vocode(models, model_config.sample_rate).await?;
    Ok(vocoded.into_chunks())
}
