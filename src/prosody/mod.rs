//! Devanagari verse to laghu/guru pattern
//!
//! Entry point is [`scan`]: the raw string is normalised (script filter,
//! whitespace collapse, length bound) and then swept left to right into
//! metrical syllables, each weighted by the classical rules:
//!
//! - long vowel (by letter or sign) -> guru
//! - anusvara, visarga or chandrabindu on the vowel -> guru
//! - two or more consonants before the next vowel (conjunct) -> guru
//! - otherwise laghu
//!
//! The conjunct rule applies across word boundaries but not across a pada
//! break (danda, double danda, sentence punctuation).

mod normalize;
mod pada;
mod syllable;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ChandasError;

pub use normalize::{normalize, NormalizedText, DEFAULT_MAX_CHARS};
pub use pada::pada_lengths;
pub use syllable::{syllabify, Syllable};

/// Metrical weight of one syllable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyllableWeight {
    Laghu,
    Guru,
}

impl SyllableWeight {
    pub fn symbol(self) -> char {
        match self {
            SyllableWeight::Laghu => 'L',
            SyllableWeight::Guru => 'G',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            'L' => Some(SyllableWeight::Laghu),
            'G' => Some(SyllableWeight::Guru),
            _ => None,
        }
    }
}

/// Ordered syllable weights of one verse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProsodyPattern(Vec<SyllableWeight>);

impl ProsodyPattern {
    pub fn new(weights: Vec<SyllableWeight>) -> Self {
        Self(weights)
    }

    pub fn weights(&self) -> &[SyllableWeight] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn guru_count(&self) -> usize {
        self.0.iter().filter(|w| **w == SyllableWeight::Guru).count()
    }

    pub fn laghu_count(&self) -> usize {
        self.len() - self.guru_count()
    }
}

impl fmt::Display for ProsodyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.0 {
            write!(f, "{}", w.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for ProsodyPattern {
    type Err = ChandasError;

    /// Parse a `G`/`L` string, e.g. `"GGLLG"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let weights = s
            .chars()
            .map(|c| {
                SyllableWeight::from_symbol(c).ok_or_else(|| {
                    ChandasError::invalid_input(format!("'{c}' is not a syllable weight (use G or L)"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if weights.is_empty() {
            return Err(ChandasError::invalid_input("empty prosody pattern"));
        }
        Ok(Self(weights))
    }
}

impl Serialize for ProsodyPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How the last syllable of each pada is weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSyllablePolicy {
    /// Weigh it like any other syllable.
    #[default]
    AsWritten,
    /// Pada-final syllable is always guru.
    Guru,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProsodyOptions {
    pub max_chars: usize,
    pub final_syllable: FinalSyllablePolicy,
}

impl Default for ProsodyOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            final_syllable: FinalSyllablePolicy::AsWritten,
        }
    }
}

/// Result of scanning one verse.
#[derive(Debug, Clone, PartialEq)]
pub struct Scansion {
    text: NormalizedText,
    syllables: Vec<Syllable>,
    pattern: ProsodyPattern,
}

impl Scansion {
    pub fn text(&self) -> &NormalizedText {
        &self.text
    }

    pub fn syllables(&self) -> &[Syllable] {
        &self.syllables
    }

    pub fn pattern(&self) -> &ProsodyPattern {
        &self.pattern
    }

    pub fn into_pattern(self) -> ProsodyPattern {
        self.pattern
    }

    /// Syllable count per pada.
    pub fn pada_lengths(&self) -> Vec<usize> {
        pada_lengths(&self.syllables)
    }
}

/// Normalise `raw` and scan it into a prosody pattern.
pub fn scan(raw: &str, options: &ProsodyOptions) -> Result<Scansion, ChandasError> {
    let text = normalize(raw, options.max_chars)?;
    let syllables = syllabify(&text, options.final_syllable);
    if syllables.is_empty() {
        return Err(ChandasError::unparsable(
            "no syllable nucleus found after normalisation",
        ));
    }
    let pattern = ProsodyPattern::new(syllables.iter().map(|s| s.weight).collect());
    tracing::debug!(syllables = pattern.len(), pattern = %pattern, "scanned verse");
    Ok(Scansion {
        text,
        syllables,
        pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn pattern_of(text: &str) -> String {
        scan(text, &ProsodyOptions::default())
            .expect("verse should scan")
            .pattern()
            .to_string()
    }

    #[test]
    fn test_reference_verse() {
        // yo vai sa pa-ra-ma brah-ma tas-ya nā-ma sat-yam
        assert_eq!(
            pattern_of("यो वै स परम ब्रह्म तस्य नाम सत्यम्।"),
            "GGLLLGGLGLGLGG"
        );
    }

    #[test]
    fn test_pattern_parse_and_display() {
        let p: ProsodyPattern = "GGLLLLGGLGGLLGG".parse().unwrap();
        assert_eq!(p.len(), 15);
        assert_eq!(p.guru_count(), 8);
        assert_eq!(p.laghu_count(), 7);
        assert_eq!(p.to_string(), "GGLLLLGGLGGLLGG");
        assert!("GXL".parse::<ProsodyPattern>().is_err());
        assert!("".parse::<ProsodyPattern>().is_err());
    }

    #[test]
    fn test_empty_and_latin_are_invalid_input() {
        let options = ProsodyOptions::default();
        for text in ["", "   ", "hello world"] {
            let err = scan(text, &options).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "input {text:?}");
        }
    }

    #[test]
    fn test_digits_only_is_unparsable() {
        let err = scan("१२३ ॥", &ProsodyOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnparsableText);
    }

    #[test]
    fn test_final_syllable_policy() {
        let options = ProsodyOptions {
            final_syllable: FinalSyllablePolicy::Guru,
            ..ProsodyOptions::default()
        };
        // ra-ma-ti | ha-ri
        let scansion = scan("रमति । हरि", &options).unwrap();
        assert_eq!(scansion.pattern().to_string(), "LLGLG");
        assert_eq!(pattern_of("रमति । हरि"), "LLLLL");
    }

    #[test]
    fn test_pattern_serializes_as_string() {
        let p: ProsodyPattern = "GLG".parse().unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"GLG\"");
    }
}
