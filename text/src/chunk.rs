//! Splits long text into model-sized chunks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Titles that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &["Mr.", "Mrs.", "Ms.", "Dr.", "Prof."];

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

/// Returns true if `head` (text up to and including a period) ends in a
/// title abbreviation or an initial such as "J.".
fn ends_with_abbreviation(head: &str) -> bool {
    let Some(word) = head.split_whitespace().last() else {
        return false;
    };
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    if !word.ends_with('.') {
        return false;
    }
    if ABBREVIATIONS.contains(&word) {
        return true;
    }
    let mut chars = word.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.'), None) if c.is_uppercase()
    )
}

/// Splits a paragraph into sentences at `.`, `!` or `?` followed by
/// whitespace. Abbreviated titles and initials do not end a sentence.
///
/// Sentences are returned trimmed, in order. Text without any boundary is
/// returned as a single sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        // The punctuation mark is ASCII, so +1 stays on a char boundary.
        let head = &text[start..m.start() + 1];
        if ends_with_abbreviation(head) {
            continue;
        }
        let sentence = head.trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Splits `text` into chunks of at most `max_len` codepoints.
///
/// Text that already fits is returned as one trimmed chunk. Longer text is
/// split into paragraphs at blank lines, and each paragraph is packed
/// greedily with whole sentences. A sentence longer than `max_len` becomes
/// its own chunk rather than being cut. Paragraphs never share a chunk.
///
/// Returns an empty vector only for empty or whitespace-only input.
pub fn chunk(text: &str, max_len: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        for sentence in split_sentences(paragraph) {
            let sentence_len = sentence.chars().count();
            if !current.is_empty() && current_len + sentence_len + 1 > max_len {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&sentence);
            current_len += sentence_len;
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }
    chunks
}
