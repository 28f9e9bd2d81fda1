//! Voice style listing.

use std::path::PathBuf;

use clap::Args;
use diffvox_synth::{FileStyleLoader, StyleLoader};

use super::print_json;
use crate::Cli;

/// Lists the voice codes found in a voice style directory.
#[derive(Args)]
pub struct VoicesCommand {
    /// Voice style directory
    #[arg(long, default_value = "assets/voice_styles")]
    voice_dir: PathBuf,
}

impl VoicesCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        if !self.voice_dir.is_dir() {
            anyhow::bail!("{} is not a directory", self.voice_dir.display());
        }
        let voices = FileStyleLoader::new(&self.voice_dir).voices();
        if cli.json {
            return print_json(&voices);
        }
        if voices.is_empty() {
            eprintln!("no voice styles in {}", self.voice_dir.display());
        }
        for voice in voices {
            println!("{voice}");
        }
        Ok(())
    }
}
