use std::fmt;
use std::str::FromStr;

/// A language the models were trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Ko,
    Es,
    Pt,
    Fr,
}

/// Returned when a language code is not one of [`Language::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language {0:?}")]
pub struct UnknownLanguage(pub String);

impl Language {
    /// Every supported language, in display order.
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Ko,
        Language::Es,
        Language::Pt,
        Language::Fr,
    ];

    /// Returns the short code used in language tags (e.g. "en").
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ko => "ko",
            Self::Es => "es",
            Self::Pt => "pt",
            Self::Fr => "fr",
        }
    }

    /// Maximum chunk length in codepoints.
    ///
    /// Korean text decomposes into roughly two to three jamo per syllable,
    /// so its chunks are kept shorter.
    pub fn max_chunk_len(&self) -> usize {
        match self {
            Self::Ko => 120,
            _ => 300,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}
