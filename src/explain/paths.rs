//! Root-to-leaf decision paths through sampled forest trees

use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::classifier::{FeatureScaler, FeatureVector, Forest, Node, FEATURE_NAMES};
use crate::error::ExplainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparator {
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
}

impl Comparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::LessOrEqual => "<=",
            Comparator::Greater => ">",
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One split condition, in raw feature units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub feature: &'static str,
    pub comparator: Comparator,
    pub threshold: f64,
    pub value: f64,
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {:.3} (value {:.3})",
            self.feature, self.comparator, self.threshold, self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionPath {
    /// Index of the tree in the forest.
    pub tree: usize,
    pub steps: Vec<PathStep>,
    /// Leaf probability of the explained class.
    pub leaf_probability: f64,
}

/// Pick `amount` distinct tree indices, reproducibly for a given seed.
/// Returned in ascending order.
pub fn sample_trees(n_trees: usize, amount: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut picked = sample(&mut rng, n_trees, amount.min(n_trees)).into_vec();
    picked.sort_unstable();
    picked
}

/// Trace tree `tree` of `forest` for the scaled row `scaled`. Thresholds are
/// mapped back through `scaler` so they read in the units of `raw`.
pub fn trace(
    forest: &Forest,
    tree: usize,
    scaled: &[f64],
    raw: &FeatureVector,
    scaler: &FeatureScaler,
    class: usize,
) -> Result<DecisionPath, ExplainError> {
    let t = forest.trees().get(tree).ok_or(ExplainError::NoTreeEnsemble)?;
    let malformed = |node| ExplainError::MalformedTree { tree, node };

    let mut steps = Vec::new();
    let mut i = 0;
    loop {
        match t.node(i).ok_or_else(|| malformed(i))? {
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                let (comparator, next) = if scaled[*feature] <= *threshold {
                    (Comparator::LessOrEqual, *left)
                } else {
                    (Comparator::Greater, *right)
                };
                steps.push(PathStep {
                    feature: FEATURE_NAMES[*feature],
                    comparator,
                    threshold: scaler.unscale(*feature, *threshold),
                    value: raw.values[*feature],
                });
                i = next;
            }
            Node::Leaf { distribution, .. } => {
                let leaf_probability = distribution.get(class).copied().ok_or_else(|| malformed(i))?;
                return Ok(DecisionPath {
                    tree,
                    steps,
                    leaf_probability,
                });
            }
        }
    }
}
