//! Public text-to-speech API.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use diffvox_audio::{AudioAssembler, SynthesisResult};
use diffvox_text::{chunk, normalize, Language, NormalizedUtterance, VocabularyIndexer};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::pipeline::{self, Models};
use crate::{
    FileStyleLoader, ModelConfig, ModelLoader, NoiseSampler, SynthError, SynthesisConfig,
    VoiceStyleCache,
};

pub const TTS_CONFIG_FILE: &str = "tts.json";
pub const VOCABULARY_FILE: &str = "unicode_indexer.json";
pub const DURATION_PREDICTOR_FILE: &str = "duration_predictor.onnx";
pub const TEXT_ENCODER_FILE: &str = "text_encoder.onnx";
pub const VECTOR_ESTIMATOR_FILE: &str = "vector_estimator.onnx";
pub const VOCODER_FILE: &str = "vocoder.onnx";

/// Loaded models, vocabulary and voice styles.
pub struct Engine {
    model_config: ModelConfig,
    indexer: VocabularyIndexer,
    models: Models,
    styles: VoiceStyleCache,
}

impl Engine {
    pub fn new(
        model_config: ModelConfig,
        indexer: VocabularyIndexer,
        models: Models,
        styles: VoiceStyleCache,
    ) -> Self {
        Self {
            model_config,
            indexer,
            models,
            styles,
        }
    }

    /// Loads everything from a model directory and a voice style directory.
    pub async fn load(
        loader: &dyn ModelLoader,
        model_dir: &Path,
        voice_style_dir: &Path,
    ) -> Result<Self, SynthError> {
        let start = Instant::now();
        let model_config = ModelConfig::load(model_dir.join(TTS_CONFIG_FILE))?;
        let indexer = VocabularyIndexer::load(model_dir.join(VOCABULARY_FILE))
            .map_err(|e| SynthError::asset(VOCABULARY_FILE, e))?;

        let load = |file: &'static str| async move {
            loader
                .load(&model_dir.join(file))
                .await
                .map_err(|e| SynthError::asset(file, e))
        };
        let (duration_predictor, text_encoder, vector_estimator, vocoder) = tokio::try_join!(
            load(DURATION_PREDICTOR_FILE),
            load(TEXT_ENCODER_FILE),
            load(VECTOR_ESTIMATOR_FILE),
            load(VOCODER_FILE),
        )?;

        if !voice_style_dir.is_dir() {
            return Err(SynthError::asset(
                "voice styles",
                format!("{} is not a directory", voice_style_dir.display()),
            ));
        }
        let styles = VoiceStyleCache::new(Arc::new(FileStyleLoader::new(voice_style_dir)));

        info!(
            sample_rate = model_config.sample_rate,
            vocabulary = indexer.len(),
            voices = styles.voices().len(),
            elapsed = ?start.elapsed(),
            "synth: engine loaded"
        );
        Ok(Self::new(
            model_config,
            indexer,
            Models {
                duration_predictor,
                text_encoder,
                vector_estimator,
                vocoder,
            },
            styles,
        ))
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    pub fn styles(&self) -> &VoiceStyleCache {
        &self.styles
    }

    /// Synthesizes `text`, splitting it into chunks that run one after the
    /// other.
    pub async fn synthesize(
        &self,
        text: &str,
        language: Language,
        voice: &str,
        config: &SynthesisConfig,
    ) -> Result<SynthesisResult, SynthError> {
        let sample_rate = self.model_config.sample_rate;
        let chunks = chunk(text, language.max_chunk_len());
        if chunks.is_empty() {
            return Ok(SynthesisResult::empty(sample_rate));
        }

        let style = self.styles.get(voice).await?;
        let mut sampler = NoiseSampler::new(config.seed);
        let mut assembler = AudioAssembler::new(sample_rate, config.silence_duration);
        for (i, text) in chunks.iter().enumerate() {
            let utterance = normalize(text, language);
            debug!(chunk = i, of = chunks.len(), len = utterance.len(), "synth: chunk");
            let encoding = self.indexer.encode_utterances(&[utterance]);
            let audio = pipeline::synthesize_batch(
                &self.models,
                &self.model_config,
                &style,
                &encoding,
                &mut sampler,
                config.denoising_steps,
                config.speech_speed,
            )
            .await?;
            for part in audio {
                assembler.push(&part.samples, part.duration);
            }
        }
        Ok(assembler.finish())
    }

    /// Synthesizes several short utterances in a single model pass.
    ///
    /// Texts are not chunked. Results come back in input order.
    pub async fn synthesize_batch(
        &self,
        items: &[(&str, Language)],
        voice: &str,
        config: &SynthesisConfig,
    ) -> Result<Vec<SynthesisResult>, SynthError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let sample_rate = self.model_config.sample_rate;
        let style = self.styles.get(voice).await?;
        let utterances: Vec<NormalizedUtterance> = items
            .iter()
            .map(|(text, lang)| normalize(text.trim(), *lang))
            .collect();
        let encoding = self.indexer.encode_utterances(&utterances);

        let mut sampler = NoiseSampler::new(config.seed);
        let audio = pipeline::synthesize_batch(
            &self.models,
            &self.model_config,
            &style,
            &encoding,
            &mut sampler,
            config.denoising_steps,
            config.speech_speed,
        )
        .await?;
        Ok(audio
            .into_iter()
            .map(|part| SynthesisResult::new(part.samples, sample_rate, part.duration))
            .collect())
    }
}

/// Text-to-speech front end.
///
/// Created empty with a [`ModelLoader`] and filled by
/// [`initialize`](Self::initialize), or built directly from an [`Engine`].
///
/// ```no_run
/// # async fn demo(loader: std::sync::Arc<dyn diffvox_synth::ModelLoader>) -> Result<(), diffvox_synth::SynthError> {
/// use diffvox_synth::{SynthesisConfig, TextToSpeech};
///
/// let tts = TextToSpeech::new(loader);
/// tts.initialize("assets/onnx".as_ref(), "assets/voice_styles".as_ref()).await?;
/// let audio = tts.synthesize("Hello world.", "en", "F1", &SynthesisConfig::default()).await?;
/// std::fs::write("hello.wav", audio.to_wav()?).unwrap();
/// # Ok(())
/// # }
/// ```
pub struct TextToSpeech {
    loader: Option<Arc<dyn ModelLoader>>,
    engine: OnceCell<Arc<Engine>>,
}

impl TextToSpeech {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader: Some(loader),
            engine: OnceCell::new(),
        }
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            loader: None,
            engine: OnceCell::new_with(Some(Arc::new(engine))),
        }
    }

    /// Loads models and the voice directory. Calls after the first
    /// successful one are no-ops.
    pub async fn initialize(
        &self,
        model_dir: &Path,
        voice_style_dir: &Path,
    ) -> Result<(), SynthError> {
        let loader = self.loader.as_deref();
        self.engine
            .get_or_try_init(|| async {
                let loader = loader.ok_or_else(|| {
                    SynthError::asset("models", "no model loader configured")
                })?;
                Engine::load(loader, model_dir, voice_style_dir).await.map(Arc::new)
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }

    fn engine(&self) -> Result<&Arc<Engine>, SynthError> {
        self.engine.get().ok_or(SynthError::NotInitialized)
    }

    pub fn sample_rate(&self) -> Result<u32, SynthError> {
        Ok(self.engine()?.model_config().sample_rate)
    }

    /// Voice codes available in the voice style directory.
    pub fn voices(&self) -> Result<Vec<String>, SynthError> {
        Ok(self.engine()?.styles().voices())
    }

    /// Synthesizes `text` in the language with code `language`.
    pub async fn synthesize(
        &self,
        text: &str,
        language: &str,
        voice: &str,
        config: &SynthesisConfig,
    ) -> Result<SynthesisResult, SynthError> {
        let engine = self.engine()?;
        config.validate()?;
        let language = parse_language(language)?;
        let start = Instant::now();
        let result = engine.synthesize(text, language, voice, config).await?;
        info!(
            language = %language,
            voice = %voice,
            duration = result.duration(),
            elapsed = ?start.elapsed(),
            "synth: done"
        );
        Ok(result)
    }

    /// Synthesizes each `(text, language code)` pair as one row of a batch.
    pub async fn synthesize_batch(
        &self,
        items: &[(&str, &str)],
        voice: &str,
        config: &SynthesisConfig,
    ) -> Result<Vec<SynthesisResult>, SynthError> {
        let engine = self.engine()?;
        config.validate()?;
        let items = items
            .iter()
            .map(|(text, lang)| Ok((*text, parse_language(lang)?)))
            .collect::<Result<Vec<_>, SynthError>>()?;
        engine.synthesize_batch(&items, voice, config).await
    }
}

fn parse_language(code: &str) -> Result<Language, SynthError> {
    code.parse()
        .map_err(|e: diffvox_text::UnknownLanguage| SynthError::InvalidConfiguration(e.to_string()))
}
