//! diffvox CLI - offline text-to-speech from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ChunkCommand, NormalizeCommand, SynthesizeCommand, VoicesCommand};

/// diffvox CLI - offline text-to-speech from the command line.
///
/// Synthesis needs a model directory (tts.json, unicode_indexer.json and the
/// four .onnx models) and a voice style directory, and a build with the
/// `ort` feature. The text subcommands work without any assets.
#[derive(Parser)]
#[command(name = "diffvox")]
#[command(about = "Diffusion text-to-speech CLI")]
#[command(version)]
pub struct Cli {
    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize speech to a WAV file
    Synthesize(SynthesizeCommand),
    /// Print the normalized, language-tagged form of text
    Normalize(NormalizeCommand),
    /// Print the chunks long text is split into
    Chunk(ChunkCommand),
    /// List available voice styles
    Voices(VoicesCommand),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Synthesize(cmd) => cmd.run(&cli).await,
        Commands::Normalize(cmd) => cmd.run(&cli),
        Commands::Chunk(cmd) => cmd.run(&cli),
        Commands::Voices(cmd) => cmd.run(&cli),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_synthesize() {
        let cli = Cli::try_parse_from([
            "diffvox", "-v", "synthesize", "Hello.", "--lang", "ko", "--steps", "8", "--seed", "3",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Synthesize(cmd) = cli.command else {
            panic!("expected synthesize");
        };
        let config = cmd.synthesis_config();
        assert_eq!(config.denoising_steps, 8);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.speech_speed, 1.05);
    }
}
