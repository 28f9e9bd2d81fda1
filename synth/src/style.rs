//! Voice style tensors and their cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::{SynthError, Tensor};

/// Voice used when a requested code is unknown.
pub const DEFAULT_VOICE: &str = "M1";

/// Conditioning tensors that describe one voice.
///
/// `ttl` conditions the text encoder and the denoiser, `dp` conditions the
/// duration predictor. Both have a leading batch dimension of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceStyle {
    code: String,
    ttl: Tensor,
    dp: Tensor,
}

#[derive(Debug, Deserialize)]
struct StyleFile {
    style_ttl: StyleComponent,
    style_dp: StyleComponent,
}

#[derive(Debug, Deserialize)]
struct StyleComponent {
    data: Vec<Vec<Vec<f32>>>,
    dims: [usize; 3],
}

impl StyleComponent {
    /// Flattens the first batch entry into a `[1, dims[1], dims[2]]` tensor.
    fn into_tensor(self, name: &str) -> Result<Tensor, String> {
        let [batch, rows, cols] = self.dims;
        if batch == 0 {
            return Err(format!("{name}: dims {:?} has an empty batch", self.dims));
        }
        let first = self
            .data
            .into_iter()
            .next()
            .ok_or_else(|| format!("{name}: no data"))?;
        if first.len() != rows || first.iter().any(|row| row.len() != cols) {
            return Err(format!("{name}: data does not match dims {:?}", self.dims));
        }
        let flat: Vec<f32> = first.into_iter().flatten().collect();
        Tensor::from_f32([1, rows, cols], flat).map_err(|e| format!("{name}: {e}"))
    }
}

impl VoiceStyle {
    pub fn new(code: impl Into<String>, ttl: Tensor, dp: Tensor) -> Self {
        Self {
            code: code.into(),
            ttl,
            dp,
        }
    }

    /// Parses a voice style JSON document.
    pub fn from_json(code: &str, data: &[u8]) -> Result<Self, SynthError> {
        let what = format!("voice style {code:?}");
        let file: StyleFile =
            serde_json::from_slice(data).map_err(|e| SynthError::asset(&what, e))?;
        let ttl = file
            .style_ttl
            .into_tensor("style_ttl")
            .map_err(|e| SynthError::asset(&what, e))?;
        let dp = file
            .style_dp
            .into_tensor("style_dp")
            .map_err(|e| SynthError::asset(&what, e))?;
        Ok(Self::new(code, ttl, dp))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn ttl(&self) -> &Tensor {
        &self.ttl
    }

    pub fn dp(&self) -> &Tensor {
        &self.dp
    }
}

/// Source of voice styles.
#[async_trait]
pub trait StyleLoader: Send + Sync {
    /// Returns true if `code` names a voice this loader can provide.
    fn contains(&self, code: &str) -> bool;

    /// Lists the available voice codes, sorted.
    fn voices(&self) -> Vec<String>;

    async fn load(&self, code: &str) -> Result<VoiceStyle, SynthError>;
}

/// Loads `<dir>/<code>.json`.
#[derive(Debug, Clone)]
pub struct FileStyleLoader {
    dir: PathBuf,
}

impl FileStyleLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, code: &str) -> Option<PathBuf> {
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| self.dir.join(format!("{code}.json")))
    }
}

#[async_trait]
impl StyleLoader for FileStyleLoader {
    fn contains(&self, code: &str) -> bool {
        self.path(code).is_some_and(|p| p.is_file())
    }

    fn voices(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut codes: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|code| self.path(code).is_some())
            .collect();
        codes.sort();
        codes
    }

    async fn load(&self, code: &str) -> Result<VoiceStyle, SynthError> {
        let path = self
            .path(code)
            .ok_or_else(|| {
                SynthError::asset(format!("voice style {code:?}"), "invalid voice code")
            })?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| SynthError::asset(path.display().to_string(), e))?;
        VoiceStyle::from_json(code, &data)
    }
}

/// Memoizes voice styles by code.
///
/// Each code is loaded at most once: concurrent first requests wait on the
/// same load and all receive the same `Arc`. A failed load leaves nothing
/// behind, so the next request retries.
pub struct VoiceStyleCache {
    loader: Arc<dyn StyleLoader>,
    default_voice: String,
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<VoiceStyle>>>>>,
}

impl VoiceStyleCache {
    pub fn new(loader: Arc<dyn StyleLoader>) -> Self {
        Self::with_default_voice(loader, DEFAULT_VOICE)
    }

    pub fn with_default_voice(
        loader: Arc<dyn StyleLoader>,
        default_voice: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            default_voice: default_voice.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Returns the style for `code`, loading it on first use.
    ///
    /// Unknown codes resolve to the default voice. The loader is only asked
    /// about codes that are not cached yet.
    pub async fn get(&self, code: &str) -> Result<Arc<VoiceStyle>, SynthError> {
        if let Some(style) = self.cached_style(code).await {
            return Ok(style);
        }

        let code = if self.loader.contains(code) {
            code
        } else {
            warn!(
                voice = %code,
                fallback = %self.default_voice,
                "synth: unknown voice, using default"
            );
            self.default_voice.as_str()
        };

        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(code.to_string()).or_default().clone()
        };

        cell.get_or_try_init(|| async {
            debug!(voice = %code, "synth: loading voice style");
            self.loader.load(code).await.map(Arc::new)
        })
        .await
        .cloned()
    }

    async fn cached_style(&self, code: &str) -> Option<Arc<VoiceStyle>> {
        self.entries
            .lock()
            .await
            .get(code)
            .and_then(|cell| cell.get().cloned())
    }

    /// Drops every cached style.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of codes with a loaded style.
    pub async fn cached(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn voices(&self) -> Vec<String> {
        self.loader.voices()
    }
}
