use diffvox_audio::AudioError;
use thiserror::Error;

use crate::pipeline::Stage;
use crate::tensor::DType;

/// Errors from constructing or reading a [`Tensor`](crate::Tensor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("tensor: shape {shape:?} needs {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("tensor: expected {expected}, found {actual}")]
    DtypeMismatch { expected: DType, actual: DType },

    #[error("tensor: cannot tile batch of {from} to {to}")]
    Tile { from: usize, to: usize },

    #[error("tensor: shape {shape:?} exceeds {limit} elements")]
    TooLarge { shape: Vec<usize>, limit: usize },
}

/// Errors reported by a [`ModelExecutor`](crate::ModelExecutor) backend.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor: {0}")]
    Backend(String),

    #[error("executor: model produced no outputs")]
    NoOutputs,

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Errors returned by the synthesis API.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("synth: engine not initialized")]
    NotInitialized,

    #[error("synth: failed to load {what}: {message}")]
    AssetLoad { what: String, message: String },

    #[error("synth: invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("synth: {stage} failed: {message}")]
    ModelExecution { stage: Stage, message: String },

    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl SynthError {
    pub(crate) fn asset(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::AssetLoad {
            what: what.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn model(stage: Stage, err: impl std::fmt::Display) -> Self {
        Self::ModelExecution {
            stage,
            message: err.to_string(),
        }
    }

    /// Returns the failing stage for model execution errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::ModelExecution { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
