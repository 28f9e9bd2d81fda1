//! Shared helpers for commands.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Returns the text argument, or the contents of `file` when given.
pub fn read_text(text: Option<&str>, file: Option<&Path>) -> anyhow::Result<String> {
    match (text, file) {
        (_, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (Some(text), None) => Ok(text.to_string()),
        (None, None) => anyhow::bail!("no text given; pass TEXT or --file"),
    }
}

/// Builds a file name from the start of `text`.
///
/// Keeps up to `max_chars` alphanumeric characters, maps everything else to
/// `_`, and collapses repeated underscores. Falls back to "speech".
pub fn sanitize_filename(text: &str, max_chars: usize) -> String {
    let mut name = String::new();
    for c in text.chars().take(max_chars) {
        let c = if c.is_alphanumeric() { c } else { '_' };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }
    let name = name.trim_matches('_');
    if name.is_empty() {
        "speech".to_string()
    } else {
        name.to_string()
    }
}
