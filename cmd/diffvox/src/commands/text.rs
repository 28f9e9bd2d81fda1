//! Text-only commands: no models needed.

use std::path::PathBuf;

use clap::Args;
use diffvox_text::{chunk, normalize, Language};
use serde::Serialize;

use super::{print_json, read_text};
use crate::Cli;

/// Prints the normalized, language-tagged form of text.
#[derive(Args)]
pub struct NormalizeCommand {
    /// Text to normalize
    text: Option<String>,

    /// Read the text from a file
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Language code (en, ko, es, pt, fr)
    #[arg(short = 'l', long, default_value = "en")]
    lang: Language,
}

#[derive(Serialize)]
struct NormalizeOutput<'a> {
    language: &'a str,
    tagged: String,
    codepoints: usize,
}

impl NormalizeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let text = read_text(self.text.as_deref(), self.file.as_deref())?;
        let utterance = normalize(&text, self.lang);
        if cli.json {
            print_json(&NormalizeOutput {
                language: self.lang.code(),
                tagged: utterance.tagged(),
                codepoints: utterance.len(),
            })
        } else {
            println!("{}", utterance.tagged());
            Ok(())
        }
    }
}

/// Prints the chunks long text is split into before synthesis.
#[derive(Args)]
pub struct ChunkCommand {
    /// Text to split
    text: Option<String>,

    /// Read the text from a file
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Language code; selects the default chunk length
    #[arg(short = 'l', long, default_value = "en")]
    lang: Language,

    /// Maximum chunk length in codepoints
    #[arg(long)]
    max_len: Option<usize>,
}

impl ChunkCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let text = read_text(self.text.as_deref(), self.file.as_deref())?;
        let max_len = self.max_len.unwrap_or_else(|| self.lang.max_chunk_len());
        let chunks = chunk(&text, max_len);
        if cli.json {
            return print_json(&chunks);
        }
        for (i, c) in chunks.iter().enumerate() {
            println!("[{}] ({} chars) {}", i + 1, c.chars().count(), c);
        }
        Ok(())
    }
}
