//! Codepoint vocabulary and batch encoding.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::{normalize, Language, NormalizedUtterance, VocabularyError};

/// On-disk form of a vocabulary table.
///
/// Both forms normalize into the same codepoint -> id mapping:
///
/// ```text
/// [-1, -1, ..., 52, 53]        list: position is the codepoint
/// {"65": 52, "66": 53}         map: decimal codepoint keys
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VocabularySource {
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl VocabularySource {
    /// Converts the source into a codepoint -> id table.
    ///
    /// Negative and non-integer ids are skipped in both forms. Map keys must
    /// be decimal codepoints.
    pub fn into_table(self) -> Result<HashMap<u32, i64>, VocabularyError> {
        let mut table = HashMap::new();
        match self {
            Self::List(entries) => {
                for (cp, entry) in entries.into_iter().enumerate() {
                    let Some(id) = entry.as_i64().filter(|id| *id >= 0) else {
                        continue;
                    };
                    let cp = u32::try_from(cp).map_err(|_| {
                        VocabularyError::Malformed(format!("codepoint {cp} out of range"))
                    })?;
                    table.insert(cp, id);
                }
            }
            Self::Map(entries) => {
                for (key, entry) in entries {
                    let cp: u32 = key.trim().parse().map_err(|_| {
                        VocabularyError::Malformed(format!("key {key:?} is not a codepoint"))
                    })?;
                    if let Some(id) = entry.as_i64().filter(|id| *id >= 0) {
                        table.insert(cp, id);
                    }
                }
            }
        }
        Ok(table)
    }
}

/// Token ids and mask for a padded batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    /// `[batch][max_len]` token ids, right-padded with 0.
    pub token_ids: Vec<Vec<i64>>,
    /// `[batch][1][max_len]` mask, 1.0 inside each row's length.
    pub mask: Vec<Vec<Vec<f32>>>,
    /// Unpadded length of each row.
    pub lengths: Vec<usize>,
}

impl Encoding {
    pub fn batch_size(&self) -> usize {
        self.token_ids.len()
    }

    /// Padded row length.
    pub fn max_len(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0)
    }

    /// Token ids flattened in row-major order.
    pub fn flat_token_ids(&self) -> Vec<i64> {
        self.token_ids.iter().flatten().copied().collect()
    }

    /// Mask flattened in row-major order.
    pub fn flat_mask(&self) -> Vec<f32> {
        self.mask.iter().flatten().flatten().copied().collect()
    }
}

/// Maps normalized codepoints to model token ids.
#[derive(Debug, Clone)]
pub struct VocabularyIndexer {
    table: HashMap<u32, i64>,
}

impl VocabularyIndexer {
    /// Builds an indexer from an already parsed source.
    pub fn from_source(source: VocabularySource) -> Result<Self, VocabularyError> {
        Ok(Self {
            table: source.into_table()?,
        })
    }

    /// Parses a JSON list or map.
    pub fn from_json(data: &[u8]) -> Result<Self, VocabularyError> {
        let source: VocabularySource = serde_json::from_slice(data)?;
        Self::from_source(source)
    }

    /// Loads a JSON vocabulary file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Number of mapped codepoints.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the id for a codepoint, or 0 if it is not in the table.
    pub fn token_id(&self, codepoint: u32) -> i64 {
        self.table.get(&codepoint).copied().unwrap_or(0)
    }

    /// Normalizes each text for its language and encodes the batch.
    pub fn encode<S: AsRef<str>>(
        &self,
        texts: &[S],
        languages: &[Language],
    ) -> Result<Encoding, VocabularyError> {
        if texts.len() != languages.len() {
            return Err(VocabularyError::BatchMismatch {
                texts: texts.len(),
                languages: languages.len(),
            });
        }
        let utterances: Vec<NormalizedUtterance> = texts
            .iter()
            .zip(languages)
            .map(|(text, lang)| normalize(text.as_ref(), *lang))
            .collect();
        Ok(self.encode_utterances(&utterances))
    }

    /// Encodes utterances that were already normalized.
    pub fn encode_utterances(&self, utterances: &[NormalizedUtterance]) -> Encoding {
        let lengths: Vec<usize> = utterances.iter().map(NormalizedUtterance::len).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        let token_ids: Vec<Vec<i64>> = utterances
            .iter()
            .map(|utt| {
                let mut row = vec![0i64; max_len];
                for (slot, cp) in row.iter_mut().zip(utt.codepoints()) {
                    *slot = self.token_id(cp);
                }
                row
            })
            .collect();

        let mask: Vec<Vec<Vec<f32>>> = lengths
            .iter()
            .map(|&len| {
                let row: Vec<f32> = (0..max_len)
                    .map(|i| if i < len { 1.0 } else { 0.0 })
                    .collect();
                vec![row]
            })
            .collect();

        Encoding {
            token_ids,
            mask,
            lengths,
        }
    }
}
