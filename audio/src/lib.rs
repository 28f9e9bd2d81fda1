//! Waveform assembly and WAV encoding.
//!
//! Synthesis runs chunk by chunk. [`AudioAssembler`] stitches the per-chunk
//! waveforms back together with a fixed pause between them and produces a
//! [`SynthesisResult`], which [`encode_wav`] turns into a 16-bit PCM WAV
//! stream.
//!
//! # Example
//!
//! ```
//! use diffvox_audio::{assemble, encode_wav};
//!
//! let waves = vec![vec![0.1f32; 240], vec![-0.1f32; 480]];
//! let result = assemble(&waves, &[0.01, 0.02], 0.005, 24000).unwrap();
//! assert_eq!(result.samples().len(), 240 + 120 + 480);
//!
//! let wav = encode_wav(result.samples(), result.sample_rate()).unwrap();
//! assert_eq!(wav.len(), 44 + 2 * result.samples().len());
//! ```

mod assemble;
mod error;
mod wav;

pub use assemble::{assemble, silence_samples, AudioAssembler, SynthesisResult};
pub use error::AudioError;
pub use wav::{encode_wav, quantize, WAV_HEADER_LEN};
