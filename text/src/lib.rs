//! Text front end for diffvox.
//!
//! Raw text goes through three stages before it reaches the models:
//!
//! 1. [`chunk`]: long input is split into chunks that respect paragraph and
//!    sentence boundaries.
//! 2. [`normalize`]: each chunk is canonicalized (Hangul and Latin
//!    decomposition, symbol cleanup, terminal punctuation) into a
//!    [`NormalizedUtterance`].
//! 3. [`VocabularyIndexer::encode`]: utterances are mapped to token ids and
//!    padded into a batch with a matching mask.
//!
//! # Example
//!
//! ```
//! use diffvox_text::{chunk, normalize, Language};
//!
//! let chunks = chunk("Hello there. How are you?", Language::En.max_chunk_len());
//! assert_eq!(chunks.len(), 1);
//!
//! let utterance = normalize(&chunks[0], Language::En);
//! assert_eq!(utterance.tagged(), "<en>Hello there. How are you?</en>");
//! ```

mod chunk;
mod error;
mod language;
mod normalize;
mod vocab;

pub use chunk::{chunk, split_sentences};
pub use error::VocabularyError;
pub use language::{Language, UnknownLanguage};
pub use normalize::{decompose_hangul, normalize, NormalizedUtterance};
pub use vocab::{Encoding, VocabularyIndexer, VocabularySource};
