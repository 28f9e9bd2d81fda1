//! Pipeline scenarios against mock models.

use super::*;
use async_trait::async_trait;
use diffvox_text::VocabularyIndexer;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Models
// ============================================================================

type Respond = dyn Fn(&NamedTensors) -> Result<NamedTensors, ExecutorError> + Send + Sync;

struct MockModel {
    calls: AtomicUsize,
    inputs: Mutex<Vec<NamedTensors>>,
    respond: Box<Respond>,
}

impl MockModel {
    fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&NamedTensors) -> Result<NamedTensors, ExecutorError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn failing() -> Arc<Self> {
        Self::new(|_| Err(ExecutorError::Backend("boom".to_string())))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn inputs(&self) -> Vec<NamedTensors> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelExecutor for MockModel {
    async fn run(&self, inputs: NamedTensors) -> Result<NamedTensors, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = (self.respond)(&inputs);
        self.inputs.lock().unwrap().push(inputs);
        out
    }
}

fn test_model_config() -> ModelConfig {
    ModelConfig {
        sample_rate: 1000,
        base_chunk_size: 50,
        chunk_compress_factor: 2,
        latent_dim: 2,
    }
}

fn input<'a>(inputs: &'a NamedTensors, name: &str) -> Result<&'a Tensor, ExecutorError> {
    inputs
        .get(name)
        .ok_or_else(|| ExecutorError::Backend(format!("missing input {name}")))
}

/// Predicts `seconds(token_count)` for every row.
fn duration_model(seconds: fn(f32) -> f32) -> Arc<MockModel> {
    MockModel::new(move |inputs| {
        let mask = input(inputs, "text_mask")?;
        let &[batch, _, len] = mask.shape() else {
            return Err(ExecutorError::Backend("bad mask".to_string()));
        };
        let mask = mask.as_f32()?;
        let durations: Vec<f32> = (0..batch)
            .map(|r| seconds(mask[r * len..(r + 1) * len].iter().sum()))
            .collect();
        Ok(NamedTensors::new().with("duration", Tensor::from_f32([batch], durations)?))
    })
}

fn encoder_model() -> Arc<MockModel> {
    MockModel::new(|inputs| {
        let ids = input(inputs, "text_ids")?;
        let (batch, len) = (ids.shape()[0], ids.shape()[1]);
        Ok(NamedTensors::new().with("text_emb", Tensor::full_f32([batch, 8, len], 0.1)))
    })
}

/// Adds 1.0 to every latent element.
fn estimator_model() -> Arc<MockModel> {
    MockModel::new(|inputs| {
        let latent = input(inputs, "noisy_latent")?;
        let next: Vec<f32> = latent.as_f32()?.iter().map(|v| v + 1.0).collect();
        let next = Tensor::from_f32(latent.shape().to_vec(), next)?;
        Ok(NamedTensors::new().with("denoised_latent", next))
    })
}

/// Emits `chunk_size` samples per latent frame, taken from channel 0.
fn vocoder_model() -> Arc<MockModel> {
    MockModel::new(|inputs| {
        let latent = input(inputs, "latent")?;
        let &[batch, channels, frames] = latent.shape() else {
            return Err(ExecutorError::Backend("bad latent".to_string()));
        };
        let data = latent.as_f32()?;
        let chunk = test_model_config().chunk_size();
        let mut wav = Vec::with_capacity(batch * frames * chunk);
        for r in 0..batch {
            for k in 0..frames * chunk {
                wav.push(data[r * channels * frames + k / chunk] * 0.1);
            }
        }
        Ok(NamedTensors::new().with("wav_tts", Tensor::from_f32([batch, frames * chunk], wav)?))
    })
}

// ============================================================================
// Mock Voice Styles
// ============================================================================

fn test_style(code: &str) -> VoiceStyle {
    VoiceStyle::new(
        code,
        Tensor::full_f32([1, 3, 4], 0.2),
        Tensor::full_f32([1, 2, 4], 0.3),
    )
}

struct MockStyles {
    voices: Mutex<Vec<String>>,
    lookups: AtomicUsize,
    loads: AtomicUsize,
    loaded: Mutex<Vec<String>>,
    delay: Duration,
    fail_next: AtomicBool,
}

impl MockStyles {
    fn new(voices: &[&str]) -> Self {
        Self {
            voices: Mutex::new(voices.iter().map(|v| v.to_string()).collect()),
            lookups: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            loaded: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            fail_next: AtomicBool::new(false),
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl StyleLoader for MockStyles {
    fn contains(&self, code: &str) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.voices.lock().unwrap().iter().any(|v| v == code)
    }

    fn voices(&self) -> Vec<String> {
        self.voices.lock().unwrap().clone()
    }

    async fn load(&self, code: &str) -> Result<VoiceStyle, SynthError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded.lock().unwrap().push(code.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SynthError::AssetLoad {
                what: code.to_string(),
                message: "flaky".to_string(),
            });
        }
        Ok(test_style(code))
    }
}

// ============================================================================
// Harness
// ============================================================================

fn ascii_indexer() -> VocabularyIndexer {
    let table: Vec<i64> = (0..128).collect();
    VocabularyIndexer::from_json(&serde_json::to_vec(&table).unwrap()).unwrap()
}

struct Harness {
    dp: Arc<MockModel>,
    te: Arc<MockModel>,
    ve: Arc<MockModel>,
    voc: Arc<MockModel>,
    styles: Arc<MockStyles>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dp: duration_model(|_| 0.5),
            te: encoder_model(),
            ve: estimator_model(),
            voc: vocoder_model(),
            styles: Arc::new(MockStyles::new(&["M1", "F1"])),
        }
    }

    fn models(&self) -> Models {
        Models {
            duration_predictor: self.dp.clone(),
            text_encoder: self.te.clone(),
            vector_estimator: self.ve.clone(),
            vocoder: self.voc.clone(),
        }
    }

    fn tts(&self) -> TextToSpeech {
        TextToSpeech::from_engine(Engine::new(
            test_model_config(),
            ascii_indexer(),
            self.models(),
            VoiceStyleCache::new(self.styles.clone()),
        ))
    }
}

fn unit_speed() -> SynthesisConfig {
    SynthesisConfig {
        speech_speed: 1.0,
        seed: Some(1),
        ..Default::default()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn test_zero_steps_vocodes_raw_noise() {
    let h = Harness::new();
    let config = SynthesisConfig {
        denoising_steps: 0,
        seed: Some(9),
        ..unit_speed()
    };
    let result = h.tts().synthesize("Hi.", "en", "M1", &config).await.unwrap();

    assert_eq!(h.ve.calls(), 0);
    assert_eq!(h.voc.calls(), 1);

    let expected = NoiseSampler::new(Some(9))
        .sample(&[0.5], &test_model_config())
        .unwrap();
    let seen = h.voc.inputs()[0].get("latent").unwrap().clone();
    assert_eq!(seen, expected.latent);

    assert_eq!(result.sample_rate(), 1000);
    assert_eq!(result.samples().len(), 500);
    assert_eq!(result.duration(), 0.5);
}

#[tokio::test]
async fn test_denoising_steps_feed_back() {
    let h = Harness::new();
    let config = SynthesisConfig {
        denoising_steps: 3,
        seed: Some(4),
        ..unit_speed()
    };
    h.tts().synthesize("Hi.", "en", "M1", &config).await.unwrap();

    assert_eq!(h.ve.calls(), 3);
    for (step, inputs) in h.ve.inputs().iter().enumerate() {
        assert_eq!(inputs.get("current_step").unwrap().as_f32().unwrap(), &[step as f32]);
        assert_eq!(inputs.get("total_step").unwrap().as_f32().unwrap(), &[3.0]);
        for name in ["noisy_latent", "text_emb", "style_ttl", "latent_mask", "text_mask"] {
            assert!(inputs.get(name).is_some(), "missing {name}");
        }
    }

    let noise = NoiseSampler::new(Some(4))
        .sample(&[0.5], &test_model_config())
        .unwrap();
    let expected: Vec<f32> = noise
        .latent
        .as_f32()
        .unwrap()
        .iter()
        .map(|v| v + 1.0 + 1.0 + 1.0)
        .collect();
    let seen = h.voc.inputs()[0].get("latent").unwrap().clone();
    assert_eq!(seen.as_f32().unwrap(), expected.as_slice());
}

#[tokio::test]
async fn test_stage_inputs() {
    let h = Harness::new();
    h.tts().synthesize("Hi.", "en", "M1", &unit_speed()).await.unwrap();

    let dp_inputs = h.dp.inputs();
    let te_inputs = h.te.inputs();
    let dp = &dp_inputs[0];
    assert_eq!(dp.names().collect::<Vec<_>>(), vec!["text_ids", "style_dp", "text_mask"]);
    let te = &te_inputs[0];
    assert_eq!(te.names().collect::<Vec<_>>(), vec!["text_ids", "style_ttl", "text_mask"]);

    // "<en>Hi.</en>"
    let ids = dp.get("text_ids").unwrap();
    assert_eq!(ids.shape(), &[1, 12]);
    assert_eq!(ids.as_i64().unwrap()[0], '<' as i64);
    assert_eq!(dp.get("text_mask").unwrap().shape(), &[1, 1, 12]);
}

#[tokio::test]
async fn test_speed_divides_durations() {
    let h = Harness {
        dp: duration_model(|_| 1.0),
        ..Harness::new()
    };
    let config = SynthesisConfig {
        speech_speed: 2.0,
        ..unit_speed()
    };
    let result = h.tts().synthesize("Hi.", "en", "M1", &config).await.unwrap();
    assert_eq!(result.duration(), 0.5);
    assert_eq!(result.samples().len(), 500);

    let result = h
        .tts()
        .synthesize("Hi.", "en", "M1", &SynthesisConfig::default())
        .await
        .unwrap();
    assert!((result.duration() - 1.0 / 1.05).abs() < 1e-6);
    assert_eq!(result.samples().len(), 952);
}

#[tokio::test]
async fn test_multi_chunk_assembly() {
    let h = Harness::new();
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let chunks = diffvox_text::chunk(&text, Language::En.max_chunk_len()).len();
    assert!(chunks > 1);

    let result = h.tts().synthesize(&text, "en", "M1", &unit_speed()).await.unwrap();

    assert_eq!(h.dp.calls(), chunks);
    assert_eq!(h.voc.calls(), chunks);
    assert_eq!(result.samples().len(), chunks * 500 + (chunks - 1) * 300);
    let expected = chunks as f64 * 0.5 + (chunks - 1) as f64 * 0.3;
    assert!((result.duration() - expected).abs() < 1e-9);
    // first silence gap
    assert!(result.samples()[500..800].iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn test_seed_is_reproducible() {
    let h = Harness::new();
    let tts = h.tts();
    let a = tts.synthesize("Hello.", "en", "M1", &unit_speed()).await.unwrap();
    let b = tts.synthesize("Hello.", "en", "M1", &unit_speed()).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_batch_synthesis() {
    let h = Harness {
        dp: duration_model(|tokens| tokens * 0.0625),
        ..Harness::new()
    };
    let results = h
        .tts()
        .synthesize_batch(&[("Hi", "en"), ("Hello", "en")], "M1", &unit_speed())
        .await
        .unwrap();

    assert_eq!(h.dp.calls(), 1);
    assert_eq!(results.len(), 2);
    // 12 and 15 tokens
    assert_eq!(results[0].duration(), 0.75);
    assert_eq!(results[0].samples().len(), 750);
    assert_eq!(results[1].duration(), 0.9375);
    assert_eq!(results[1].samples().len(), 937);

    let dp_inputs = h.dp.inputs();
    assert_eq!(dp_inputs[0].get("style_dp").unwrap().shape(), &[2, 2, 4]);
    assert_eq!(h.te.inputs()[0].get("style_ttl").unwrap().shape(), &[2, 3, 4]);
}

#[tokio::test]
async fn test_batch_row_with_zero_duration() {
    let h = Harness {
        // "Hi" encodes to 12 tokens, "Hello" to 15
        dp: duration_model(|tokens| if tokens < 13.0 { 0.0 } else { 0.5 }),
        ..Harness::new()
    };
    let results = h
        .tts()
        .synthesize_batch(&[("Hi", "en"), ("Hello", "en")], "M1", &unit_speed())
        .await
        .unwrap();

    assert!(results[0].is_empty());
    assert_eq!(results[0].duration(), 0.0);
    assert_eq!(results[1].samples().len(), 500);

    let ve_inputs = h.ve.inputs();
    let mask = ve_inputs[0].get("latent_mask").unwrap();
    assert_eq!(mask.shape(), &[2, 1, 5]);
    assert_eq!(mask.as_f32().unwrap(), &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
}

#[tokio::test]
async fn test_empty_batch_and_text() {
    let h = Harness::new();
    let tts = h.tts();
    assert!(tts.synthesize_batch(&[], "M1", &unit_speed()).await.unwrap().is_empty());

    let result = tts.synthesize(" \n ", "en", "M1", &unit_speed()).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(result.duration(), 0.0);
    assert_eq!(h.dp.calls(), 0);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_errors_name_their_stage() {
    let cases = [
        (
            Harness {
                dp: MockModel::failing(),
                ..Harness::new()
            },
            Stage::DurationPredictor,
        ),
        (
            Harness {
                te: MockModel::failing(),
                ..Harness::new()
            },
            Stage::TextEncoder,
        ),
        (
            Harness {
                ve: MockModel::failing(),
                ..Harness::new()
            },
            Stage::VectorEstimator { step: 0 },
        ),
        (
            Harness {
                voc: MockModel::failing(),
                ..Harness::new()
            },
            Stage::Vocoder,
        ),
    ];
    for (h, stage) in cases {
        let err = h
            .tts()
            .synthesize("Hi.", "en", "M1", &SynthesisConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(stage), "{err}");
        assert!(err.to_string().contains("boom"));
    }
}

#[tokio::test]
async fn test_wrong_duration_count() {
    let h = Harness {
        dp: MockModel::new(|_| {
            Ok(NamedTensors::new().with("duration", Tensor::full_f32([3], 1.0)))
        }),
        ..Harness::new()
    };
    let err = h
        .tts()
        .synthesize("Hi.", "en", "M1", &unit_speed())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::DurationPredictor));
}

#[tokio::test]
async fn test_out_of_range_durations_are_rejected() {
    // speed that passes validation but scales durations past any sane length
    let h = Harness::new();
    let tiny_speed = SynthesisConfig {
        speech_speed: 1e-30,
        ..unit_speed()
    };
    tiny_speed.validate().unwrap();
    let err = h
        .tts()
        .synthesize("Hi.", "en", "M1", &tiny_speed)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::DurationPredictor), "{err}");
    assert_eq!(h.ve.calls(), 0);
    assert_eq!(h.voc.calls(), 0);

    for seconds in [f32::INFINITY, f32::NAN, MAX_ROW_DURATION * 2.0] {
        let h = Harness {
            dp: MockModel::new(move |_| {
                Ok(NamedTensors::new().with("duration", Tensor::full_f32([1], seconds)))
            }),
            ..Harness::new()
        };
        let err = h
            .tts()
            .synthesize("Hi.", "en", "M1", &unit_speed())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::DurationPredictor), "{seconds}: {err}");
        assert_eq!(h.voc.calls(), 0);
    }
}

#[tokio::test]
async fn test_zero_durations_are_rejected() {
    let h = Harness {
        dp: duration_model(|_| 0.0),
        ..Harness::new()
    };
    let err = h
        .tts()
        .synthesize("Hi.", "en", "M1", &unit_speed())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::DurationPredictor), "{err}");
    assert_eq!(h.ve.calls(), 0);
}

#[tokio::test]
async fn test_not_initialized() {
    struct NoLoader;

    #[async_trait]
    impl ModelLoader for NoLoader {
        async fn load(&self, _path: &Path) -> Result<Arc<dyn ModelExecutor>, ExecutorError> {
            Err(ExecutorError::Backend("unused".to_string()))
        }
    }

    let tts = TextToSpeech::new(Arc::new(NoLoader));
    assert!(!tts.is_initialized());
    let err = tts
        .synthesize("Hi.", "en", "M1", &SynthesisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthError::NotInitialized));
    assert!(matches!(tts.sample_rate(), Err(SynthError::NotInitialized)));
    assert!(matches!(tts.voices(), Err(SynthError::NotInitialized)));
}

#[tokio::test]
async fn test_invalid_configuration() {
    let h = Harness::new();
    let tts = h.tts();

    let err = tts.synthesize("Hi.", "de", "M1", &unit_speed()).await.unwrap_err();
    assert!(matches!(err, SynthError::InvalidConfiguration(_)));

    let bad = SynthesisConfig {
        speech_speed: 0.0,
        ..Default::default()
    };
    let err = tts.synthesize("Hi.", "en", "M1", &bad).await.unwrap_err();
    assert!(matches!(err, SynthError::InvalidConfiguration(_)));

    let err = tts
        .synthesize_batch(&[("Hi", "en"), ("Hola", "xx")], "M1", &unit_speed())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthError::InvalidConfiguration(_)));
    assert_eq!(h.dp.calls(), 0);
}

// ============================================================================
// Voice Styles
// ============================================================================

#[tokio::test]
async fn test_unknown_voice_falls_back() {
    let h = Harness::new();
    let tts = h.tts();
    tts.synthesize("Hi.", "en", "nobody", &unit_speed()).await.unwrap();
    assert_eq!(h.styles.loaded(), vec!["M1"]);

    tts.synthesize("Hi.", "ko", "F1", &unit_speed()).await.unwrap();
    assert_eq!(h.styles.loaded(), vec!["M1", "F1"]);

    // cached
    tts.synthesize("Hi.", "en", "M1", &unit_speed()).await.unwrap();
    assert_eq!(h.styles.loads(), 2);
    assert_eq!(tts.voices().unwrap(), vec!["M1", "F1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_style_loads_coalesce() {
    let styles = Arc::new(MockStyles {
        delay: Duration::from_millis(20),
        ..MockStyles::new(&["M1"])
    });
    let cache = Arc::new(VoiceStyleCache::new(styles.clone()));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("M1").await.unwrap() })
        })
        .collect();
    let mut got = Vec::new();
    for handle in handles {
        got.push(handle.await.unwrap());
    }

    assert_eq!(styles.loads(), 1);
    assert!(got.iter().all(|s| Arc::ptr_eq(s, &got[0])));
    assert_eq!(cache.cached().await, 1);
}

#[tokio::test]
async fn test_failed_style_load_is_retried() {
    let styles = Arc::new(MockStyles::new(&["M1"]));
    styles.fail_next.store(true, Ordering::SeqCst);
    let cache = VoiceStyleCache::new(styles.clone());

    assert!(matches!(cache.get("M1").await, Err(SynthError::AssetLoad { .. })));
    assert_eq!(cache.cached().await, 0);
    let style = cache.get("M1").await.unwrap();
    assert_eq!(style.code(), "M1");
    assert_eq!(styles.loads(), 2);
}

#[tokio::test]
async fn test_cached_style_skips_loader_lookup() {
    let styles = Arc::new(MockStyles::new(&["M1", "F1"]));
    let cache = VoiceStyleCache::new(styles.clone());

    let first = cache.get("F1").await.unwrap();
    assert_eq!(styles.lookups.load(Ordering::SeqCst), 1);
    for _ in 0..5 {
        cache.get("F1").await.unwrap();
    }
    assert_eq!(styles.lookups.load(Ordering::SeqCst), 1);

    // removed from the source after caching: still served from the cache
    styles.voices.lock().unwrap().retain(|v| v != "F1");
    let again = cache.get("F1").await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(again.code(), "F1");
    assert_eq!(styles.loads(), 1);
}

#[tokio::test]
async fn test_clear_drops_styles() {
    let styles = Arc::new(MockStyles::new(&["M1"]));
    let cache = VoiceStyleCache::new(styles.clone());

    let first = cache.get("M1").await.unwrap();
    cache.clear().await;
    let second = cache.get("M1").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(styles.loads(), 2);
    assert_eq!(cache.default_voice(), DEFAULT_VOICE);
}

// ============================================================================
// Initialization From Disk
// ============================================================================

struct MockLoader {
    harness: Harness,
    loaded: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load(&self, path: &Path) -> Result<Arc<dyn ModelExecutor>, ExecutorError> {
        if !path.is_file() {
            return Err(ExecutorError::Backend(format!("{} not found", path.display())));
        }
        let file = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or_default()
            .to_string();
        self.loaded.lock().unwrap().push(file.clone());
        let model: Arc<dyn ModelExecutor> = match file.as_str() {
            DURATION_PREDICTOR_FILE => self.harness.dp.clone(),
            TEXT_ENCODER_FILE => self.harness.te.clone(),
            VECTOR_ESTIMATOR_FILE => self.harness.ve.clone(),
            VOCODER_FILE => self.harness.voc.clone(),
            other => return Err(ExecutorError::Backend(format!("unexpected {other}"))),
        };
        Ok(model)
    }
}

fn write_assets(model_dir: &Path, voice_dir: &Path) {
    std::fs::write(
        model_dir.join(TTS_CONFIG_FILE),
        r#"{"ae": {"sample_rate": 1000, "base_chunk_size": 50},
            "ttl": {"chunk_compress_factor": 2, "latent_dim": 2}}"#,
    )
    .unwrap();
    let table: Vec<i64> = (0..128).collect();
    std::fs::write(
        model_dir.join(VOCABULARY_FILE),
        serde_json::to_vec(&table).unwrap(),
    )
    .unwrap();
    for file in [
        DURATION_PREDICTOR_FILE,
        TEXT_ENCODER_FILE,
        VECTOR_ESTIMATOR_FILE,
        VOCODER_FILE,
    ] {
        std::fs::write(model_dir.join(file), b"onnx").unwrap();
    }

    let style = serde_json::json!({
        "style_ttl": {"data": vec![vec![vec![0.2f32; 4]; 3]], "dims": [1, 3, 4], "type": "float32"},
        "style_dp": {"data": vec![vec![vec![0.3f32; 4]; 2]], "dims": [1, 2, 4], "type": "float32"},
    });
    std::fs::write(voice_dir.join("M1.json"), style.to_string()).unwrap();
}

#[tokio::test]
async fn test_initialize_from_directories() {
    let model_dir = tempfile::tempdir().unwrap();
    let voice_dir = tempfile::tempdir().unwrap();
    write_assets(model_dir.path(), voice_dir.path());

    let loader = Arc::new(MockLoader {
        harness: Harness::new(),
        loaded: Mutex::new(Vec::new()),
    });
    let tts = TextToSpeech::new(loader.clone());
    tts.initialize(model_dir.path(), voice_dir.path()).await.unwrap();
    assert!(tts.is_initialized());
    assert_eq!(tts.sample_rate().unwrap(), 1000);
    assert_eq!(tts.voices().unwrap(), vec!["M1"]);
    assert_eq!(loader.loaded.lock().unwrap().len(), 4);

    // second call is a no-op
    tts.initialize(model_dir.path(), voice_dir.path()).await.unwrap();
    assert_eq!(loader.loaded.lock().unwrap().len(), 4);

    let result = tts.synthesize("Hi.", "en", "F9", &unit_speed()).await.unwrap();
    assert_eq!(result.samples().len(), 500);
}

#[tokio::test]
async fn test_initialize_reports_missing_assets() {
    let model_dir = tempfile::tempdir().unwrap();
    let voice_dir = tempfile::tempdir().unwrap();
    write_assets(model_dir.path(), voice_dir.path());
    std::fs::remove_file(model_dir.path().join(VOCODER_FILE)).unwrap();

    let loader = Arc::new(MockLoader {
        harness: Harness::new(),
        loaded: Mutex::new(Vec::new()),
    });
    let tts = TextToSpeech::new(loader);
    let err = tts
        .initialize(model_dir.path(), voice_dir.path())
        .await
        .unwrap_err();
    match err {
        SynthError::AssetLoad { what, .. } => assert_eq!(what, VOCODER_FILE),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!tts.is_initialized());

    std::fs::remove_file(model_dir.path().join(VOCABULARY_FILE)).unwrap();
    let err = tts
        .initialize(model_dir.path(), voice_dir.path())
        .await
        .unwrap_err();
    match err {
        SynthError::AssetLoad { what, .. } => assert_eq!(what, VOCABULARY_FILE),
        other => panic!("unexpected error: {other}"),
    }
}
