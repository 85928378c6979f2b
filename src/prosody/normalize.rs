use serde::Serialize;

use crate::error::ChandasError;

/// Upper bound on raw input length, in Unicode scalar values.
pub const DEFAULT_MAX_CHARS: usize = 5000;

/// Punctuation kept alongside the Devanagari block.
const ALLOWED_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?', '\'', '"', '-', '(', ')'];

pub(crate) fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

/// Verse text restricted to Devanagari plus allowed punctuation, with
/// whitespace collapsed to single spaces. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip everything outside the allow-list and collapse whitespace.
///
/// The length bound is checked on the raw input, before any stripping.
pub fn normalize(raw: &str, max_chars: usize) -> Result<NormalizedText, ChandasError> {
    if raw.trim().is_empty() {
        return Err(ChandasError::invalid_input("text is empty"));
    }
    let raw_len = raw.chars().count();
    if raw_len > max_chars {
        return Err(ChandasError::invalid_input(format!(
            "text is {raw_len} characters long, limit is {max_chars}"
        )));
    }

    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    let mut has_devanagari = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        let devanagari = is_devanagari(c);
        if !devanagari && !ALLOWED_PUNCTUATION.contains(&c) {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        has_devanagari |= devanagari;
        out.push(c);
    }

    if !has_devanagari {
        return Err(ChandasError::invalid_input("no Devanagari content"));
    }
    Ok(NormalizedText(out))
}
