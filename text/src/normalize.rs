//! Text canonicalization ahead of tokenization.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Language;

const HANGUL_BASE: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
const JAMO_LEAD_BASE: u32 = 0x1100;
const JAMO_VOWEL_BASE: u32 = 0x1161;
const JAMO_TRAIL_BASE: u32 = 0x11A7;
const VOWEL_COUNT: u32 = 21;
const TRAIL_COUNT: u32 = 28;

const GRAVE: char = '\u{0300}';
const ACUTE: char = '\u{0301}';
const CIRCUMFLEX: char = '\u{0302}';
const TILDE: char = '\u{0303}';
const DIAERESIS: char = '\u{0308}';
const CEDILLA: char = '\u{0327}';

/// Precomposed Latin letters used by Spanish, Portuguese and French, mapped
/// to base letter + combining mark.
static LATIN_DECOMPOSITIONS: &[(char, char, char)] = &[
    ('á', 'a', ACUTE),
    ('é', 'e', ACUTE),
    ('í', 'i', ACUTE),
    ('ó', 'o', ACUTE),
    ('ú', 'u', ACUTE),
    ('ý', 'y', ACUTE),
    ('Á', 'A', ACUTE),
    ('É', 'E', ACUTE),
    ('Í', 'I', ACUTE),
    ('Ó', 'O', ACUTE),
    ('Ú', 'U', ACUTE),
    ('Ý', 'Y', ACUTE),
    ('à', 'a', GRAVE),
    ('è', 'e', GRAVE),
    ('ì', 'i', GRAVE),
    ('ò', 'o', GRAVE),
    ('ù', 'u', GRAVE),
    ('À', 'A', GRAVE),
    ('È', 'E', GRAVE),
    ('Ì', 'I', GRAVE),
    ('Ò', 'O', GRAVE),
    ('Ù', 'U', GRAVE),
    ('â', 'a', CIRCUMFLEX),
    ('ê', 'e', CIRCUMFLEX),
    ('î', 'i', CIRCUMFLEX),
    ('ô', 'o', CIRCUMFLEX),
    ('û', 'u', CIRCUMFLEX),
    ('Â', 'A', CIRCUMFLEX),
    ('Ê', 'E', CIRCUMFLEX),
    ('Î', 'I', CIRCUMFLEX),
    ('Ô', 'O', CIRCUMFLEX),
    ('Û', 'U', CIRCUMFLEX),
    ('ã', 'a', TILDE),
    ('õ', 'o', TILDE),
    ('ñ', 'n', TILDE),
    ('Ã', 'A', TILDE),
    ('Õ', 'O', TILDE),
    ('Ñ', 'N', TILDE),
    ('ä', 'a', DIAERESIS),
    ('ë', 'e', DIAERESIS),
    ('ï', 'i', DIAERESIS),
    ('ö', 'o', DIAERESIS),
    ('ü', 'u', DIAERESIS),
    ('ÿ', 'y', DIAERESIS),
    ('Ä', 'A', DIAERESIS),
    ('Ë', 'E', DIAERESIS),
    ('Ï', 'I', DIAERESIS),
    ('Ö', 'O', DIAERESIS),
    ('Ü', 'U', DIAERESIS),
    ('Ÿ', 'Y', DIAERESIS),
    ('ç', 'c', CEDILLA),
    ('Ç', 'C', CEDILLA),
];

static LATIN_TABLE: Lazy<HashMap<char, (char, char)>> = Lazy::new(|| {
    LATIN_DECOMPOSITIONS
        .iter()
        .map(|&(composed, base, mark)| (composed, (base, mark)))
        .collect()
});

/// Emoji, pictograph, dingbat and regional-indicator (flag) blocks.
static EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F),
    (0x1F300, 0x1F5FF),
    (0x1F680, 0x1F6FF),
    (0x1F700, 0x1F77F),
    (0x1F780, 0x1F7FF),
    (0x1F800, 0x1F8FF),
    (0x1F900, 0x1F9FF),
    (0x1FA00, 0x1FA6F),
    (0x1FA70, 0x1FAFF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
    (0x1F1E6, 0x1F1FF),
];

static SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2013}', "-"),
    ('\u{2011}', "-"),
    ('\u{2014}', "-"),
    ('_', " "),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{00B4}', "'"),
    ('`', "'"),
    ('[', " "),
    (']', " "),
    ('|', " "),
    ('/', " "),
    ('#', " "),
    ('\u{2192}', " "),
    ('\u{2190}', " "),
];

static STRIPPED_SYMBOLS: &[char] = &['♥', '☆', '♡', '©', '\\'];

static EXPRESSIONS: &[(&str, &str)] = &[
    ("@", " at "),
    ("e.g.,", "for example, "),
    ("i.e.,", "that is, "),
];

/// Characters that already close a sentence; anything else gets a period.
static CLOSERS: &[char] = &[
    '.', '!', '?', ';', ':', ',', '\'', '"', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', ')',
    ']', '}', '…', '。', '」', '』', '】', '〉', '》', '›', '»',
];

static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ([,.!?;:'])").expect("valid regex"));
static REPEATED_DOUBLE_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""{2,}"#).expect("valid regex"));
static REPEATED_SINGLE_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'{2,}").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Text that has been canonicalized for one language.
///
/// The body and the language are kept apart; the `<lang>…</lang>` form the
/// models expect is only produced by [`NormalizedUtterance::tagged`] and
/// [`NormalizedUtterance::codepoints`]. Normalization takes raw text, so a
/// tagged string never gets wrapped a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUtterance {
    body: String,
    language: Language,
}

impl NormalizedUtterance {
    /// Returns the normalized text without language tags.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the language the text was normalized for.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Returns true if normalization removed every character.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Renders the utterance wrapped in its language tag.
    pub fn tagged(&self) -> String {
        let code = self.language.code();
        format!("<{code}>{}</{code}>", self.body)
    }

    /// Iterates the codepoints of the tagged utterance, in order.
    pub fn codepoints(&self) -> impl Iterator<Item = u32> + '_ {
        let code = self.language.code();
        let open = ['<'].into_iter().chain(code.chars()).chain(['>']);
        let close = ['<', '/'].into_iter().chain(code.chars()).chain(['>']);
        open.chain(self.body.chars())
            .chain(close)
            .map(|c| c as u32)
    }

    /// Number of codepoints in the tagged utterance.
    pub fn len(&self) -> usize {
        self.body.chars().count() + 2 * self.language.code().len() + 5
    }
}

impl fmt::Display for NormalizedUtterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tagged())
    }
}

/// Decomposes a precomposed Hangul syllable into its conjoining jamo.
///
/// Returns `None` for characters outside U+AC00..=U+D7A3. The trailing
/// consonant is `None` when the syllable has no final jamo.
pub fn decompose_hangul(c: char) -> Option<(char, char, Option<char>)> {
    let cp = c as u32;
    if !(HANGUL_BASE..=HANGUL_LAST).contains(&cp) {
        return None;
    }
    let index = cp - HANGUL_BASE;
    let lead = JAMO_LEAD_BASE + index / (VOWEL_COUNT * TRAIL_COUNT);
    let vowel = JAMO_VOWEL_BASE + (index % (VOWEL_COUNT * TRAIL_COUNT)) / TRAIL_COUNT;
    let trail_offset = index % TRAIL_COUNT;
    let trail = (trail_offset != 0)
        .then(|| char::from_u32(JAMO_TRAIL_BASE + trail_offset))
        .flatten();
    Some((char::from_u32(lead)?, char::from_u32(vowel)?, trail))
}

fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

/// Applies decomposition, emoji stripping and the symbol tables, in that
/// order, to a single character.
fn push_canonical(out: &mut String, c: char) {
    if let Some((lead, vowel, trail)) = decompose_hangul(c) {
        out.push(lead);
        out.push(vowel);
        if let Some(trail) = trail {
            out.push(trail);
        }
        return;
    }
    if let Some(&(base, mark)) = LATIN_TABLE.get(&c) {
        out.push(base);
        out.push(mark);
        return;
    }
    if is_emoji(c) || STRIPPED_SYMBOLS.contains(&c) {
        return;
    }
    match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
        Some((_, to)) => out.push_str(to),
        None => out.push(c),
    }
}

/// Canonicalizes `text` for the given language.
///
/// The result has decomposed Hangul and accented Latin letters, no emoji,
/// normalized dashes and quotes, single spaces, and ends with sentence
/// punctuation unless it is empty.
pub fn normalize(text: &str, language: Language) -> NormalizedUtterance {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_canonical(&mut out, c);
    }

    for (from, to) in EXPRESSIONS {
        out = out.replace(from, to);
    }

    let out = SPACE_BEFORE_PUNCT.replace_all(&out, "$1");
    let out = REPEATED_DOUBLE_QUOTE.replace_all(&out, "\"");
    let out = REPEATED_SINGLE_QUOTE.replace_all(&out, "'");
    let out = WHITESPACE.replace_all(&out, " ");
    let mut body = out.trim().to_string();

    if let Some(last) = body.chars().last() {
        if !CLOSERS.contains(&last) {
            body.push('.');
        }
    }

    NormalizedUtterance { body, language }
}
