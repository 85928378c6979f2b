//! Post-hoc explanations for one prediction
//!
//! - [`shap`]: exact TreeSHAP attributions over the forest member
//! - [`paths`]: decision paths through a seeded sample of forest trees
//! - [`counterfactual`]: single-feature nudges that flip the prediction
//!
//! Explanations are computed against the uncalibrated forest inside the
//! calibrated ensemble, on the scaled feature row the trees were fitted on.
//! Failures are reported as [`ExplainError`] and never abort a prediction.

pub mod counterfactual;
pub mod paths;
pub mod shap;

use serde::Serialize;

use crate::classifier::{FeatureVector, ModelContext, FEATURE_NAMES, NUM_FEATURES};
use crate::error::{ErrorKind, ExplainError};

pub use counterfactual::Counterfactual;
pub use paths::{Comparator, DecisionPath, PathStep};
pub use shap::ShapValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Pushes toward the explained class.
    Positive,
    /// Pushes away from it.
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureAttribution {
    pub feature: &'static str,
    /// Raw (unscaled) feature value.
    pub value: f64,
    pub contribution: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// Class index the attributions refer to.
    pub class_index: usize,
    pub class_label: String,
    /// Top attributions by absolute contribution.
    pub top_features: Vec<FeatureAttribution>,
    /// Forest probability of the class with every feature missing.
    pub expected_value: f64,
    /// All attributions in feature order.
    #[serde(skip)]
    pub contributions: [f64; NUM_FEATURES],
    pub decision_paths: Vec<DecisionPath>,
    pub counterfactuals: Vec<Counterfactual>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplainOptions {
    pub top_features: usize,
    pub sampled_trees: usize,
    pub seed: u64,
    pub counterfactuals: usize,
}

impl Default for ExplainOptions {
    fn default() -> Self {
        Self {
            top_features: 5,
            sampled_trees: 3,
            seed: 42,
            counterfactuals: 5,
        }
    }
}

/// Whether an outcome carries an explanation, and why not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplanationStatus {
    NotRequested,
    Computed(Box<Explanation>),
    Skipped { reason: String },
    Unavailable { kind: ErrorKind, reason: String },
}

impl ExplanationStatus {
    pub fn explanation(&self) -> Option<&Explanation> {
        match self {
            ExplanationStatus::Computed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<Explanation, ExplainError>> for ExplanationStatus {
    fn from(result: Result<Explanation, ExplainError>) -> Self {
        match result {
            Ok(e) => ExplanationStatus::Computed(Box::new(e)),
            Err(err) => ExplanationStatus::Unavailable {
                kind: err.kind(),
                reason: err.to_string(),
            },
        }
    }
}

/// Rank attributions by absolute contribution, largest first.
fn rank(values: &[f64; NUM_FEATURES], raw: &FeatureVector, top: usize) -> Vec<FeatureAttribution> {
    let mut order: Vec<usize> = (0..NUM_FEATURES).collect();
    order.sort_by(|&a, &b| values[b].abs().total_cmp(&values[a].abs()).then(a.cmp(&b)));
    order
        .into_iter()
        .take(top)
        .map(|i| FeatureAttribution {
            feature: FEATURE_NAMES[i],
            value: raw.values[i],
            contribution: values[i],
            direction: if values[i] >= 0.0 {
                Direction::Positive
            } else {
                Direction::Negative
            },
        })
        .collect()
}

/// Explain `class` for one raw feature vector.
pub fn explain(
    ctx: &ModelContext,
    features: &FeatureVector,
    class: usize,
    options: &ExplainOptions,
) -> Result<Explanation, ExplainError> {
    if class >= ctx.n_classes() {
        return Err(ExplainError::ClassIndexOutOfBounds {
            index: class,
            n_classes: ctx.n_classes(),
        });
    }
    let forest = ctx.ensemble().explainable_forest(class)?;
    let scaled = ctx.scaler().transform(features);

    let shap = shap::tree_shap(forest, &scaled, class)?;
    let top_features = rank(&shap.values, features, options.top_features);

    let decision_paths = paths::sample_trees(forest.trees().len(), options.sampled_trees, options.seed)
        .into_iter()
        .map(|tree| paths::trace(forest, tree, &scaled, features, ctx.scaler(), class))
        .collect::<Result<Vec<_>, _>>()?;

    let counterfactuals = counterfactual::counterfactuals(ctx, features, options.counterfactuals);

    tracing::debug!(
        class,
        expected = shap.expected_value,
        paths = decision_paths.len(),
        counterfactuals = counterfactuals.len(),
        "explanation computed"
    );
    Ok(Explanation {
        class_index: class,
        class_label: ctx.labels().name(class).unwrap_or_default().to_string(),
        top_features,
        expected_value: shap.expected_value,
        contributions: shap.values,
        decision_paths,
        counterfactuals,
    })
}
