use thiserror::Error;

/// Errors returned while loading or applying a vocabulary table.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("vocabulary: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vocabulary: malformed table: {0}")]
    Malformed(String),

    #[error("vocabulary: {texts} texts but {languages} languages")]
    BatchMismatch { texts: usize, languages: usize },
}

impl From<serde_json::Error> for VocabularyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
