use serde::Serialize;

use super::normalize::NormalizedText;
use super::{FinalSyllablePolicy, SyllableWeight};

const VIRAMA: char = '\u{094D}';
const NUKTA: char = '\u{093C}';

/// One metrical syllable and where it sits in the verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Syllable {
    pub weight: SyllableWeight,
    /// Zero-based pada (quarter-verse) index.
    pub pada: usize,
    /// Zero-based word index across the whole verse.
    pub word: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glyph {
    Consonant,
    Vowel { long: bool },
    Sign { long: bool },
    Virama,
    Nasal,
    WordBreak,
    PadaBreak,
    Ignored,
}

fn glyph(c: char) -> Glyph {
    match c {
        '\u{0915}'..='\u{0939}' | '\u{0958}'..='\u{095F}' | '\u{0979}'..='\u{097F}' => {
            Glyph::Consonant
        }
        'अ' | 'इ' | 'उ' | 'ऋ' | 'ऌ' | 'ऎ' | 'ऒ' => Glyph::Vowel { long: false },
        'आ' | 'ई' | 'ऊ' | 'ॠ' | 'ॡ' | 'ए' | 'ऐ' | 'ओ' | 'औ' | 'ऍ' | 'ऑ' => {
            Glyph::Vowel { long: true }
        }
        'ि' | 'ु' | 'ृ' | 'ॢ' | 'ॆ' | 'ॊ' => Glyph::Sign { long: false },
        'ा' | 'ी' | 'ू' | 'ॄ' | 'ॣ' | 'े' | 'ै' | 'ो' | 'ौ' | 'ॅ' | 'ॉ' => Glyph::Sign { long: true },
        VIRAMA => Glyph::Virama,
        // chandrabindu, anusvara, visarga
        '\u{0900}'..='\u{0903}' => Glyph::Nasal,
        ' ' | ',' | '-' => Glyph::WordBreak,
        '।' | '॥' | '.' | ';' | ':' | '!' | '?' => Glyph::PadaBreak,
        _ => Glyph::Ignored,
    }
}

#[derive(Debug, Clone, Copy)]
enum Phone {
    Consonant,
    Vowel {
        long: bool,
        nasal: bool,
        word: usize,
    },
}

/// Sweep the text into per-pada phone sequences. Each consonant either
/// carries a vowel (explicit sign or inherent `a`) or is dead (virama).
fn phones(text: &NormalizedText) -> Vec<Vec<Phone>> {
    let mut padas: Vec<Vec<Phone>> = Vec::new();
    let mut current: Vec<Phone> = Vec::new();
    let mut word = 0usize;
    let mut word_open = false;
    let mut chars = text.as_str().chars().peekable();

    while let Some(c) = chars.next() {
        let g = glyph(c);
        match g {
            Glyph::Consonant => {
                word_open = true;
                current.push(Phone::Consonant);
                while chars.peek() == Some(&NUKTA) {
                    chars.next();
                }
                match chars.peek().copied().map(glyph) {
                    Some(Glyph::Virama) => {
                        chars.next();
                    }
                    Some(Glyph::Sign { long }) => {
                        chars.next();
                        current.push(Phone::Vowel {
                            long,
                            nasal: false,
                            word,
                        });
                    }
                    _ => current.push(Phone::Vowel {
                        long: false,
                        nasal: false,
                        word,
                    }),
                }
            }
            Glyph::Vowel { long } | Glyph::Sign { long } => {
                word_open = true;
                current.push(Phone::Vowel {
                    long,
                    nasal: false,
                    word,
                });
            }
            Glyph::Nasal => {
                if let Some(Phone::Vowel { nasal, .. }) = current
                    .iter_mut()
                    .rev()
                    .find(|p| matches!(p, Phone::Vowel { .. }))
                {
                    *nasal = true;
                }
            }
            Glyph::WordBreak | Glyph::PadaBreak => {
                if word_open {
                    word += 1;
                    word_open = false;
                }
                if g == Glyph::PadaBreak && !current.is_empty() {
                    padas.push(std::mem::take(&mut current));
                }
            }
            Glyph::Virama | Glyph::Ignored => {}
        }
    }
    if !current.is_empty() {
        padas.push(current);
    }
    padas
}

/// Segment normalised text into weighted syllables.
///
/// A syllable is guru when its vowel is long, nasalised (anusvara,
/// chandrabindu) or carries visarga, or when two or more consonants stand
/// between it and the next vowel of the same pada. A pada-final syllable
/// closed by a dead consonant is guru as well.
pub fn syllabify(text: &NormalizedText, policy: FinalSyllablePolicy) -> Vec<Syllable> {
    let mut syllables = Vec::new();
    let mut pada_index = 0usize;

    for pada in phones(text) {
        let nuclei: Vec<usize> = pada
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, Phone::Vowel { .. }))
            .map(|(i, _)| i)
            .collect();
        if nuclei.is_empty() {
            continue;
        }

        for (k, &pos) in nuclei.iter().enumerate() {
            let Phone::Vowel { long, nasal, word } = pada[pos] else {
                continue;
            };
            let is_last = k + 1 == nuclei.len();
            let next = nuclei.get(k + 1).copied().unwrap_or(pada.len());
            let following_consonants = next - pos - 1;

            let heavy = long
                || nasal
                || following_consonants >= 2
                || (is_last && following_consonants >= 1)
                || (is_last && policy == FinalSyllablePolicy::Guru);

            syllables.push(Syllable {
                weight: if heavy {
                    SyllableWeight::Guru
                } else {
                    SyllableWeight::Laghu
                },
                pada: pada_index,
                word,
            });
        }
        pada_index += 1;
    }
    syllables
}
