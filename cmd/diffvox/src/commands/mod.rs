//! CLI commands module.

mod synthesize;
mod text;
mod util;
mod voices;

pub use synthesize::SynthesizeCommand;
pub use text::{ChunkCommand, NormalizeCommand};
pub use voices::VoicesCommand;

pub(crate) use util::*;
