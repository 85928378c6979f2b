//! Boosted member of the voting ensemble
//!
//! Wraps the `gbdt` crate as a one-vs-rest multiclass model: one binary
//! `LogLikelyhood` booster per class, each giving P(class | x). The per-class
//! outputs are normalised into a distribution.
//!
//! Note: the gbdt crate internally uses `f32` (`ValueType`), while the
//! feature pipeline works in `f64`. Conversions happen at the crate boundary.

use gbdt::config::Config;
use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;

use super::ensemble::{normalise, Estimator};
use super::features::NUM_FEATURES;
use crate::error::{Artifact, ArtifactError};

#[inline]
fn to_f32(x: &[f64]) -> Vec<f32> {
    x.iter().map(|&v| v as f32).collect()
}

/// One-vs-rest boosted classifier.
pub struct BoostedMember {
    models: Vec<GBDT>,
}

impl std::fmt::Debug for BoostedMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoostedMember")
            .field("models", &self.models.len())
            .finish()
    }
}

impl BoostedMember {
    /// Parse the per-class boosters from their serialised JSON form.
    ///
    /// Each model must have been fitted on the full feature width; a booster
    /// that reports another width, or that produces a non-finite score on a
    /// all-zero input, is rejected here rather than at prediction time.
    pub(crate) fn from_json(models: Vec<serde_json::Value>) -> Result<Self, ArtifactError> {
        let mut parsed = Vec::with_capacity(models.len());
        for (class, value) in models.into_iter().enumerate() {
            let width = value
                .pointer("/conf/feature_size")
                .and_then(serde_json::Value::as_u64);
            if let Some(width) = width {
                if width as usize != NUM_FEATURES {
                    return Err(ArtifactError::invalid(
                        Artifact::Ensemble,
                        format!(
                            "boosted model {class} was fitted on {width} features, expected {NUM_FEATURES}"
                        ),
                    ));
                }
            }
            let model: GBDT = serde_json::from_value(value).map_err(|e| {
                ArtifactError::invalid(
                    Artifact::Ensemble,
                    format!("boosted model {class} is not a gbdt model: {e}"),
                )
            })?;
            parsed.push(model);
        }
        Self::from_trained(parsed)
    }

    /// Wrap already-trained boosters, one per class in class-index order.
    pub(crate) fn from_trained(models: Vec<GBDT>) -> Result<Self, ArtifactError> {
        if models.is_empty() {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                "boosted member has no models",
            ));
        }
        let member = Self { models };
        let zeros = [0.0; NUM_FEATURES];
        if let Some(class) = member.raw_scores(&zeros).iter().position(|s| !s.is_finite()) {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                format!("boosted model {class} produces a non-finite score"),
            ));
        }
        Ok(member)
    }

    /// Un-normalised one-vs-rest probabilities.
    pub fn raw_scores(&self, x: &[f64]) -> Vec<f64> {
        let data = vec![Data::new_test_data(to_f32(x), None)];
        self.models
            .iter()
            .map(|m| m.predict(&data).first().copied().unwrap_or(0.0) as f64)
            .collect()
    }
}

impl Estimator for BoostedMember {
    fn n_classes(&self) -> usize {
        self.models.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let scores = self
            .raw_scores(x)
            .into_iter()
            .map(|s| if s.is_finite() { s.max(0.0) } else { 0.0 })
            .collect();
        normalise(scores)
    }
}

/// Fit a one-vs-rest boosted member.
///
/// - `features`: scaled feature rows
/// - `labels`: class index per row
/// - `num_trees`: boosting iterations per class (e.g. 20)
/// - `max_depth`: maximum tree depth (e.g. 3)
/// - `learning_rate`: shrinkage / step size (e.g. 0.3)
///
/// Model fitting is not part of classification; this exists for building
/// reference artifacts and test fixtures.
pub fn train_one_vs_rest(
    features: &[[f64; NUM_FEATURES]],
    labels: &[usize],
    n_classes: usize,
    num_trees: usize,
    max_depth: u32,
    learning_rate: f64,
) -> Result<Vec<GBDT>, String> {
    if features.is_empty() {
        return Err("no training samples provided".into());
    }
    if features.len() != labels.len() {
        return Err(format!(
            "feature count ({}) does not match label count ({})",
            features.len(),
            labels.len()
        ));
    }

    let mut models = Vec::with_capacity(n_classes);
    for class in 0..n_classes {
        let mut cfg = Config::new();
        cfg.set_feature_size(NUM_FEATURES);
        cfg.set_max_depth(max_depth);
        cfg.set_iterations(num_trees);
        cfg.set_shrinkage(learning_rate as f32);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);
        cfg.set_min_leaf_size(1);

        let mut gbdt = GBDT::new(&cfg);
        let mut training_data: Vec<Data> = features
            .iter()
            .zip(labels)
            .map(|(f, &label)| {
                let target = if label == class { 1.0_f32 } else { -1.0_f32 };
                Data::new_training_data(to_f32(f), 1.0_f32, target, None)
            })
            .collect();
        gbdt.fit(&mut training_data);
        models.push(gbdt);
    }
    Ok(models)
}
