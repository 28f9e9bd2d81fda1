//! Boundary to the runtime that executes trained networks.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{ExecutorError, NamedTensors};

/// Runs one trained network on named inputs.
///
/// Implementations must return outputs in the model's declared order; the
/// pipeline reads the first output of every stage.
#[async_trait]
pub trait ModelExecutor: Send + Sync {
    async fn run(&self, inputs: NamedTensors) -> Result<NamedTensors, ExecutorError>;
}

/// Creates executors from model files.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Arc<dyn ModelExecutor>, ExecutorError>;
}
