//! Shared fixture: a small reference model fitted from the canonical gana
//! patterns of ten meters.
//!
//! The artifacts are fitted once per test binary and written into a fresh
//! temp directory for every test that asks for one.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, OnceLock};

use chandas::classifier::gbdt_model::train_one_vs_rest;
use chandas::classifier::{extract, TreeArrays, NUM_FEATURES};
use chandas::{ModelContext, ProsodyPattern, FEATURE_NAMES};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use tempfile::TempDir;

/// One pada of each meter, as laghu/guru.
pub const METERS: [(&str, &str); 10] = [
    ("इन्द्रवज्रा", "GGLGGLLGLGG"),
    ("उपेन्द्रवज्रा", "LGLGGLLGLGG"),
    ("मन्दाक्रान्ता", "GGGGLLLLLGGLGGLGG"),
    ("वसन्ततिलका", "GGLGLLLGLLGLGG"),
    ("अनुष्टुभ्", "GLGGLGGLLGLGGLGL"),
    ("मालिनी", "LLLLLLGGGLGGLGG"),
    ("शार्दूलविक्रीडितम्", "GGGLLGLGLLLGGGLGGLG"),
    ("शिखरिणी", "LGGGGGLLLLLGGLLLG"),
    ("द्रुतविलम्बितम्", "LLLGLLGLLGLG"),
    ("भुजङ्गप्रयातम्", "LGGLGGLGGLGG"),
];

const FOREST_TREES: usize = 12;
const MAX_DEPTH: usize = 32;
const CANONICAL_COPIES: usize = 3;

/// Devanagari text that scans to `pattern`: guru is `का`, laghu is `क`.
pub fn verse(pattern: &str) -> String {
    pattern
        .chars()
        .map(|c| if c == 'G' { "का" } else { "क" })
        .collect()
}

pub struct Artifacts {
    pub labels: Value,
    pub scaler: Value,
    pub ensemble: Value,
    /// Label names in class-index order.
    pub names: Vec<String>,
}

impl Artifacts {
    pub fn class_of(&self, meter: &str) -> usize {
        self.names
            .iter()
            .position(|n| n == meter)
            .expect("meter is in the label table")
    }
}

/// Fitted once per test binary.
pub fn artifacts() -> &'static Artifacts {
    static ARTIFACTS: OnceLock<Artifacts> = OnceLock::new();
    ARTIFACTS.get_or_init(fit)
}

pub fn write_artifacts(dir: &Path, labels: &Value, scaler: &Value, ensemble: &Value) {
    for (name, value) in [
        ("labels.json", labels),
        ("scaler.json", scaler),
        ("ensemble.json", ensemble),
    ] {
        std::fs::write(dir.join(name), serde_json::to_string(value).unwrap()).unwrap();
    }
}

/// A temp directory holding the reference artifacts.
pub fn model_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let a = artifacts();
    write_artifacts(dir.path(), &a.labels, &a.scaler, &a.ensemble);
    dir
}

pub fn context() -> Arc<ModelContext> {
    let dir = model_dir();
    Arc::new(ModelContext::load(dir.path()).expect("reference model loads"))
}

fn training_set(names: &[String]) -> (Vec<[f64; NUM_FEATURES]>, Vec<usize>) {
    let canonical: Vec<&str> = METERS.iter().map(|(_, p)| *p).collect();
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for (meter, pattern) in METERS {
        let class = names.iter().position(|n| n == meter).unwrap();
        let mut push = |p: &str| {
            let parsed: ProsodyPattern = p.parse().unwrap();
            rows.push(extract(&parsed).values);
            labels.push(class);
        };
        for _ in 0..CANONICAL_COPIES {
            push(pattern);
        }
        for i in 0..pattern.len() {
            let flipped: String = pattern
                .chars()
                .enumerate()
                .map(|(j, c)| match (j == i, c) {
                    (true, 'G') => 'L',
                    (true, _) => 'G',
                    (false, c) => c,
                })
                .collect();
            if !canonical.contains(&flipped.as_str()) {
                push(&flipped);
            }
        }
    }
    (rows, labels)
}

fn fit_scaler(rows: &[[f64; NUM_FEATURES]]) -> ([f64; NUM_FEATURES], [f64; NUM_FEATURES]) {
    let n = rows.len() as f64;
    let mut mean = [0.0; NUM_FEATURES];
    let mut scale = [0.0; NUM_FEATURES];
    for j in 0..NUM_FEATURES {
        mean[j] = rows.iter().map(|r| r[j]).sum::<f64>() / n;
        let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
        scale[j] = var.sqrt();
    }
    (mean, scale)
}

fn fit() -> Artifacts {
    let mut names: Vec<String> = METERS.iter().map(|(m, _)| m.to_string()).collect();
    names.sort();
    let n_classes = names.len();

    let (rows, labels) = training_set(&names);
    let (mean, scale) = fit_scaler(&rows);
    let scaled: Vec<[f64; NUM_FEATURES]> = rows
        .iter()
        .map(|r| {
            let mut s = [0.0; NUM_FEATURES];
            for j in 0..NUM_FEATURES {
                let sd = if scale[j] == 0.0 { 1.0 } else { scale[j] };
                s[j] = (r[j] - mean[j]) / sd;
            }
            s
        })
        .collect();

    let trees: Vec<TreeArrays> = (0..FOREST_TREES)
        .map(|t| {
            let mut rng = ChaCha8Rng::seed_from_u64(1000 + t as u64);
            let sample: Vec<usize> = (0..scaled.len())
                .map(|_| rng.random_range(0..scaled.len()))
                .collect();
            grow_tree(&scaled, &labels, n_classes, sample)
        })
        .collect();

    let boosted = train_one_vs_rest(&scaled, &labels, n_classes, 20, 3, 0.3).unwrap();
    let boosted: Vec<Value> = boosted
        .iter()
        .map(|m| serde_json::to_value(m).unwrap())
        .collect();

    let calibration: Vec<Value> = (0..n_classes)
        .map(|_| json!({ "a": -8.0, "b": 4.0 }))
        .collect();

    Artifacts {
        labels: json!({ "labels": names }),
        scaler: json!({
            "feature_names": FEATURE_NAMES.to_vec(),
            "mean": mean.to_vec(),
            "scale": scale.to_vec(),
        }),
        ensemble: json!({
            "n_features": NUM_FEATURES,
            "n_classes": n_classes,
            "voting": { "weights": [0.7, 0.3] },
            "forest": { "trees": trees },
            "boosted": { "models": boosted },
            "calibration": { "method": "sigmoid", "classes": calibration },
        }),
        names,
    }
}

// ---------------------------------------------------------------------------
// Minimal CART (gini, exhaustive thresholds) emitting parallel arrays
// ---------------------------------------------------------------------------

struct TreeBuilder<'a> {
    x: &'a [[f64; NUM_FEATURES]],
    y: &'a [usize],
    n_classes: usize,
    arrays: TreeArrays,
}

fn gini(counts: &[f64], total: f64) -> f64 {
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

impl TreeBuilder<'_> {
    fn counts(&self, idx: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in idx {
            counts[self.y[i]] += 1.0;
        }
        counts
    }

    fn best_split(&self, idx: &[usize]) -> Option<(usize, f64)> {
        let total = idx.len() as f64;
        let parent = gini(&self.counts(idx), total);
        let mut best: Option<(usize, f64, f64)> = None;

        for f in 0..NUM_FEATURES {
            let mut order: Vec<usize> = idx.to_vec();
            order.sort_by(|&a, &b| self.x[a][f].total_cmp(&self.x[b][f]));
            let mut left = vec![0.0; self.n_classes];
            let mut right = self.counts(idx);
            for k in 0..order.len() - 1 {
                let c = self.y[order[k]];
                left[c] += 1.0;
                right[c] -= 1.0;
                let (lo, hi) = (self.x[order[k]][f], self.x[order[k + 1]][f]);
                if lo == hi {
                    continue;
                }
                let nl = (k + 1) as f64;
                let nr = total - nl;
                let impurity = (nl * gini(&left, nl) + nr * gini(&right, nr)) / total;
                let gain = parent - impurity;
                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((f, (lo + hi) / 2.0, gain));
                }
            }
        }
        best.map(|(f, t, _)| (f, t))
    }

    fn grow(&mut self, idx: Vec<usize>, depth: usize) -> usize {
        let node = self.arrays.children_left.len();
        let counts = self.counts(&idx);
        self.arrays.children_left.push(-1);
        self.arrays.children_right.push(-1);
        self.arrays.feature.push(-2);
        self.arrays.threshold.push(-2.0);
        self.arrays.value.push(counts.clone());
        self.arrays.n_node_samples.push(idx.len() as f64);

        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        if pure || depth >= MAX_DEPTH || idx.len() < 2 {
            return node;
        }
        let Some((feature, threshold)) = self.best_split(&idx) else {
            return node;
        };
        let (left, right): (Vec<usize>, Vec<usize>) =
            idx.into_iter().partition(|&i| self.x[i][feature] <= threshold);
        if left.is_empty() || right.is_empty() {
            return node;
        }

        let l = self.grow(left, depth + 1);
        let r = self.grow(right, depth + 1);
        self.arrays.children_left[node] = l as i64;
        self.arrays.children_right[node] = r as i64;
        self.arrays.feature[node] = feature as i64;
        self.arrays.threshold[node] = threshold;
        node
    }
}

fn grow_tree(
    x: &[[f64; NUM_FEATURES]],
    y: &[usize],
    n_classes: usize,
    sample: Vec<usize>,
) -> TreeArrays {
    let mut builder = TreeBuilder {
        x,
        y,
        n_classes,
        arrays: TreeArrays {
            children_left: Vec::new(),
            children_right: Vec::new(),
            feature: Vec::new(),
            threshold: Vec::new(),
            value: Vec::new(),
            n_node_samples: Vec::new(),
        },
    };
    builder.grow(sample, 0);
    builder.arrays
}
