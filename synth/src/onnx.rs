//! ONNX Runtime backed executors.

use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::{DynValue, Tensor as OrtTensor};
use tracing::debug;

use crate::{ExecutorError, ModelExecutor, ModelLoader, NamedTensors, Tensor, TensorData};

fn backend(context: &str, err: impl std::fmt::Display) -> ExecutorError {
    ExecutorError::Backend(format!("{context}: {err}"))
}

/// Runs one ONNX model. Sessions are not reentrant, so runs are serialized.
pub struct OrtExecutor {
    session: Arc<Mutex<Session>>,
    output_names: Vec<String>,
}

impl OrtExecutor {
    pub fn from_file(path: &Path) -> Result<Self, ExecutorError> {
        let session = Session::builder()
            .map_err(|e| backend("session builder", e))?
            .commit_from_file(path)
            .map_err(|e| backend(&format!("load {}", path.display()), e))?;
        let output_names = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            output_names,
        })
    }
}

fn to_ort(tensor: Tensor) -> Result<DynValue, ExecutorError> {
    let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
    let value = match tensor.data().clone() {
        TensorData::F32(data) => OrtTensor::from_array((shape, data))
            .map_err(|e| backend("input", e))?
            .into_dyn(),
        TensorData::I64(data) => OrtTensor::from_array((shape, data))
            .map_err(|e| backend("input", e))?
            .into_dyn(),
    };
    Ok(value)
}

fn run_session(
    session: &Mutex<Session>,
    output_names: &[String],
    inputs: NamedTensors,
) -> Result<NamedTensors, ExecutorError> {
    let values = inputs
        .into_iter()
        .map(|(name, tensor)| Ok((Cow::Owned(name), SessionInputValue::from(to_ort(tensor)?))))
        .collect::<Result<Vec<(Cow<'_, str>, SessionInputValue<'_>)>, ExecutorError>>()?;

    let mut session = session
        .lock()
        .map_err(|e| backend("session lock", e))?;
    let outputs = session
        .run(SessionInputs::from(values))
        .map_err(|e| backend("run", e))?;

    let mut result = NamedTensors::new();
    for name in output_names {
        let value = &outputs[name.as_str()];
        let tensor = if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
            let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            Tensor::from_f32(shape, data.to_vec())?
        } else {
            let (shape, data) = value
                .try_extract_tensor::<i64>()
                .map_err(|e| backend(name, e))?;
            let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            Tensor::from_i64(shape, data.to_vec())?
        };
        result.push(name.clone(), tensor);
    }
    if result.is_empty() {
        return Err(ExecutorError::NoOutputs);
    }
    Ok(result)
}

#[async_trait]
impl ModelExecutor for OrtExecutor {
    async fn run(&self, inputs: NamedTensors) -> Result<NamedTensors, ExecutorError> {
        let session = Arc::clone(&self.session);
        let output_names = self.output_names.clone();
        tokio::task::spawn_blocking(move || run_session(&session, &output_names, inputs))
            .await
            .map_err(|e| backend("join", e))?
    }
}

/// Loads `.onnx` files into [`OrtExecutor`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtModelLoader;

#[async_trait]
impl ModelLoader for OrtModelLoader {
    async fn load(&self, path: &Path) -> Result<Arc<dyn ModelExecutor>, ExecutorError> {
        let path = path.to_path_buf();
        let executor = tokio::task::spawn_blocking(move || {
            debug!(path = %path.display(), "synth: loading onnx model");
            OrtExecutor::from_file(&path)
        })
        .await
        .map_err(|e| backend("join", e))??;
        Ok(Arc::new(executor))
    }
}
