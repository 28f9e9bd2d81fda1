//! Diffusion text-to-speech pipeline.
//!
//! Text is chunked and normalized by `diffvox-text`, then each chunk runs
//! through four networks:
//!
//! 1. duration predictor: how long the utterance lasts
//! 2. text encoder: text embedding conditioned on the voice
//! 3. vector estimator: refines Gaussian noise into a latent, once per
//!    denoising step
//! 4. vocoder: latent to waveform
//!
//! The networks themselves sit behind [`ModelExecutor`]. Enable the `ort`
//! feature for an ONNX Runtime implementation (`OrtModelLoader`).
//!
//! # Usage
//!
//! ```ignore
//! use diffvox_synth::{OrtModelLoader, SynthesisConfig, TextToSpeech};
//! use std::sync::Arc;
//!
//! let tts = TextToSpeech::new(Arc::new(OrtModelLoader));
//! tts.initialize("assets/onnx".as_ref(), "assets/voice_styles".as_ref()).await?;
//!
//! let config = SynthesisConfig { seed: Some(1), ..Default::default() };
//! let audio = tts.synthesize("Hello there. How are you?", "en", "M1", &config).await?;
//! std::fs::write("out.wav", audio.to_wav()?)?;
//! ```

mod config;
mod error;
mod executor;
mod noise;
pub mod pipeline;
mod style;
mod tensor;
mod tts;

#[cfg(feature = "ort")]
mod onnx;

#[cfg(test)]
mod tests;

pub use config::{ModelConfig, SynthesisConfig};
pub use error::{ExecutorError, SynthError, TensorError};
pub use executor::{ModelExecutor, ModelLoader};
pub use noise::{latent_length, LatentNoise, NoiseSampler, MAX_LATENT_ELEMENTS};
pub use pipeline::{ChunkAudio, Models, Stage, MAX_ROW_DURATION};
pub use style::{FileStyleLoader, StyleLoader, VoiceStyle, VoiceStyleCache, DEFAULT_VOICE};
pub use tensor::{DType, NamedTensors, Tensor, TensorData};
pub use tts::{
    Engine, TextToSpeech, DURATION_PREDICTOR_FILE, TEXT_ENCODER_FILE, TTS_CONFIG_FILE,
    VECTOR_ESTIMATOR_FILE, VOCABULARY_FILE, VOCODER_FILE,
};

#[cfg(feature = "ort")]
pub use onnx::{OrtExecutor, OrtModelLoader};

pub use diffvox_audio::SynthesisResult;
pub use diffvox_text::Language;
