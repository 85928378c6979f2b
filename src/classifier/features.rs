//! 41-feature extractor over a laghu/guru pattern
//!
//! The column order below is the order the frozen scaler and ensemble were
//! fitted with. Reordering, renaming or inserting a column breaks every
//! shipped model, so `FEATURE_NAMES` is checked against the scaler artifact
//! at load time.
//!
//! Feature groups:
//!   0..6   length, counts, ratio, percentages
//!   6..18  selected 2-, 3- and 4-gram counts
//!  18..24  runs and alternation
//!  24..30  guru density in the start/middle/end quarters
//!  30..35  n-gram variety and entropy
//!  35..41  symmetry, periodicity, weighted positions

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::prosody::{ProsodyPattern, SyllableWeight};

/// Number of features produced by the extractor.
pub const NUM_FEATURES: usize = 41;

/// Feature names, in extraction order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "pattern_length",
    "guru_count",
    "laghu_count",
    "guru_laghu_ratio",
    "laghu_percentage",
    "guru_percentage",
    "gg_count",
    "ll_count",
    "gl_count",
    "lg_count",
    "ggg_count",
    "lll_count",
    "glg_count",
    "lgl_count",
    "glgl_count",
    "lglg_count",
    "ggll_count",
    "llgg_count",
    "max_guru_run",
    "max_laghu_run",
    "avg_guru_run",
    "avg_laghu_run",
    "alternations",
    "alternation_rate",
    "start_g_count",
    "middle_g_count",
    "end_g_count",
    "start_g_ratio",
    "middle_g_ratio",
    "end_g_ratio",
    "bigram_variety",
    "trigram_variety",
    "fourgram_variety",
    "entropy_bigram",
    "entropy_trigram",
    "symmetry_score",
    "pattern_period",
    "periodicity_ratio",
    "is_periodic",
    "weighted_g_position",
    "weighted_l_position",
];

/// Column index of a feature name.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// 41-dimensional feature vector in `FEATURE_NAMES` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.values[i])
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_FEATURES))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Counts of every window of width `n`, indexed by the window read as a
/// binary number (guru = 1, first syllable most significant).
struct NgramCounts {
    counts: Vec<usize>,
}

fn encode(window: impl IntoIterator<Item = bool>) -> usize {
    window.into_iter().fold(0, |acc, g| (acc << 1) | usize::from(g))
}

impl NgramCounts {
    fn new(bits: &[bool], n: usize) -> Self {
        let mut counts = vec![0; 1 << n];
        if bits.len() >= n {
            for w in bits.windows(n) {
                counts[encode(w.iter().copied())] += 1;
            }
        }
        Self { counts }
    }

    fn count_of(&self, pattern: &str) -> f64 {
        let key = encode(pattern.chars().map(|c| c == 'G'));
        self.counts.get(key).copied().unwrap_or(0) as f64
    }

    /// Number of distinct windows observed.
    fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Shannon entropy in bits; 0 for an empty distribution. Terms are
    /// summed in window order so the result is bit-stable.
    fn entropy(&self) -> f64 {
        let total: usize = self.counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        self.counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum::<f64>()
            .max(0.0)
    }
}

/// Shortest period that tiles the whole pattern, or its length.
fn period(bits: &[bool]) -> usize {
    let n = bits.len();
    (1..=n / 2)
        .find(|&p| n % p == 0 && bits.chunks(p).all(|chunk| chunk == &bits[..p]))
        .unwrap_or(n)
}

fn guru_in(bits: &[bool]) -> f64 {
    bits.iter().filter(|b| **b).count() as f64
}

fn ratio(count: f64, len: usize) -> f64 {
    if len == 0 {
        0.0
    } else {
        count / len as f64
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

/// Extract the feature vector from a pattern. Pure and deterministic; every
/// value is finite for any non-empty pattern.
pub fn extract(pattern: &ProsodyPattern) -> FeatureVector {
    let bits: Vec<bool> = pattern
        .weights()
        .iter()
        .map(|w| *w == SyllableWeight::Guru)
        .collect();
    let n = bits.len();
    let nf = n.max(1) as f64;

    let guru = pattern.guru_count() as f64;
    let laghu = pattern.laghu_count() as f64;
    let guru_laghu_ratio = if laghu > 0.0 { guru / laghu } else { 0.0 };

    let bigrams = NgramCounts::new(&bits, 2);
    let trigrams = NgramCounts::new(&bits, 3);
    let fourgrams = NgramCounts::new(&bits, 4);

    // Runs
    let mut guru_runs = Vec::new();
    let mut laghu_runs = Vec::new();
    for run in bits.chunk_by(|a, b| a == b) {
        if run[0] {
            guru_runs.push(run.len());
        } else {
            laghu_runs.push(run.len());
        }
    }
    let max_guru_run = guru_runs.iter().copied().max().unwrap_or(0) as f64;
    let max_laghu_run = laghu_runs.iter().copied().max().unwrap_or(0) as f64;
    let alternations = bits.windows(2).filter(|w| w[0] != w[1]).count() as f64;
    let alternation_rate = if n > 1 { alternations / n as f64 } else { 0.0 };

    // Quarters. The middle window is centred on n/2 and is empty for
    // patterns of 4..8 syllables, where the quarter is a single syllable.
    let quarter = (n / 4).max(1).min(n);
    let start = &bits[..quarter];
    let middle = if n >= 4 {
        &bits[n / 2 - quarter / 2..n / 2 + quarter / 2]
    } else {
        &bits[..]
    };
    let end = &bits[n - quarter..];

    let symmetry = bits
        .iter()
        .zip(bits.iter().rev())
        .filter(|(a, b)| a == b)
        .count() as f64
        / nf;

    let pattern_period = period(&bits);
    let position_sum = |want: bool| -> f64 {
        bits.iter()
            .enumerate()
            .filter(|(_, b)| **b == want)
            .map(|(i, _)| (i + 1) as f64)
            .sum()
    };
    let weighted_g = if guru > 0.0 {
        position_sum(true) / (nf * guru)
    } else {
        0.0
    };
    let weighted_l = if laghu > 0.0 {
        position_sum(false) / (nf * laghu)
    } else {
        0.0
    };

    FeatureVector::new([
        n as f64,
        guru,
        laghu,
        guru_laghu_ratio,
        ratio(laghu, n),
        ratio(guru, n),
        bigrams.count_of("GG"),
        bigrams.count_of("LL"),
        bigrams.count_of("GL"),
        bigrams.count_of("LG"),
        trigrams.count_of("GGG"),
        trigrams.count_of("LLL"),
        trigrams.count_of("GLG"),
        trigrams.count_of("LGL"),
        fourgrams.count_of("GLGL"),
        fourgrams.count_of("LGLG"),
        fourgrams.count_of("GGLL"),
        fourgrams.count_of("LLGG"),
        max_guru_run,
        max_laghu_run,
        mean(&guru_runs),
        mean(&laghu_runs),
        alternations,
        alternation_rate,
        guru_in(start),
        guru_in(middle),
        guru_in(end),
        ratio(guru_in(start), start.len()),
        ratio(guru_in(middle), middle.len()),
        ratio(guru_in(end), end.len()),
        bigrams.distinct() as f64,
        trigrams.distinct() as f64,
        fourgrams.distinct() as f64,
        bigrams.entropy(),
        trigrams.entropy(),
        symmetry,
        pattern_period as f64,
        pattern_period as f64 / nf,
        if pattern_period < n { 1.0 } else { 0.0 },
        weighted_g,
        weighted_l,
    ])
}
