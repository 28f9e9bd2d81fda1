//! Speech synthesis command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use diffvox_synth::{ModelLoader, SynthesisConfig, SynthesisResult, TextToSpeech, DEFAULT_VOICE};
use serde::Serialize;
use tracing::info;

use super::{print_json, read_text, sanitize_filename};
use crate::Cli;

/// Synthesizes speech from text and writes 16-bit PCM WAV files.
///
/// With --batch, every line of the input is synthesized as its own
/// utterance in a single model pass and written to its own file.
#[derive(Args)]
pub struct SynthesizeCommand {
    /// Text to synthesize
    text: Option<String>,

    /// Read the text from a file
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Language code (en, ko, es, pt, fr)
    #[arg(short = 'l', long, default_value = "en")]
    lang: String,

    /// Voice style code
    #[arg(long, default_value = DEFAULT_VOICE)]
    voice: String,

    /// Model directory
    #[arg(long, default_value = "assets/onnx")]
    model_dir: PathBuf,

    /// Voice style directory
    #[arg(long, default_value = "assets/voice_styles")]
    voice_dir: PathBuf,

    /// Denoising steps
    #[arg(long, default_value_t = 5)]
    steps: usize,

    /// Speech speed
    #[arg(long, default_value_t = 1.05)]
    speed: f32,

    /// Silence between chunks in seconds
    #[arg(long, default_value_t = 0.3)]
    silence: f64,

    /// Noise seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output WAV file (default: derived from the text)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Directory for derived output names
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Treat each input line as a separate utterance
    #[arg(long)]
    batch: bool,
}

#[derive(Serialize)]
struct Written {
    path: String,
    duration: f64,
    sample_rate: u32,
    samples: usize,
}

#[cfg(feature = "ort")]
fn model_loader() -> anyhow::Result<Arc<dyn ModelLoader>> {
    Ok(Arc::new(diffvox_synth::OrtModelLoader))
}

#[cfg(not(feature = "ort"))]
fn model_loader() -> anyhow::Result<Arc<dyn ModelLoader>> {
    anyhow::bail!("diffvox was built without ONNX Runtime; rebuild with `--features ort`")
}

impl SynthesizeCommand {
    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            denoising_steps: self.steps,
            speech_speed: self.speed,
            silence_duration: self.silence,
            seed: self.seed,
        }
    }

    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let text = read_text(self.text.as_deref(), self.file.as_deref())?;
        let config = self.synthesis_config();
        config.validate()?;

        let tts = TextToSpeech::new(model_loader()?);
        tts.initialize(&self.model_dir, &self.voice_dir)
            .await
            .context("failed to load models")?;

        let written = if self.batch {
            let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            let items: Vec<(&str, &str)> = lines.iter().map(|l| (*l, self.lang.as_str())).collect();
            let results = tts.synthesize_batch(&items, &self.voice, &config).await?;
            let mut written = Vec::with_capacity(results.len());
            for (i, (line, result)) in lines.iter().zip(&results).enumerate() {
                let name = format!("{}_{}.wav", i + 1, sanitize_filename(line, 20));
                let path = self.output_dir.join(name);
                written.push(write_wav(&path, result)?);
            }
            written
        } else {
            let result = tts.synthesize(&text, &self.lang, &self.voice, &config).await?;
            let path = match &self.output {
                Some(path) => path.clone(),
                None => self.output_dir.join(format!("{}.wav", sanitize_filename(&text, 20))),
            };
            vec![write_wav(&path, &result)?]
        };

        if cli.json {
            return print_json(&written);
        }
        for w in &written {
            println!("{} ({:.2}s)", w.path, w.duration);
        }
        Ok(())
    }
}

fn write_wav(path: &Path, result: &SynthesisResult) -> anyhow::Result<Written> {
    let wav = result.to_wav()?;
    std::fs::write(path, &wav).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), duration = result.duration(), "wrote wav");
    Ok(Written {
        path: path.display().to_string(),
        duration: result.duration(),
        sample_rate: result.sample_rate(),
        samples: result.samples().len(),
    })
}
