//! Calibrated soft-voting ensemble
//!
//! Layering, outermost first:
//!
//! ```text
//! CalibratedEnsemble   per-class sigmoid over the voting scores
//!   └─ VotingEnsemble  weighted mean of member distributions
//!        ├─ Forest           walkable trees (explanations run here)
//!        └─ BoostedMember    opaque gbdt boosters
//! ```
//!
//! Every layer answers `predict_proba`. Only the layers that can hand out
//! walkable trees answer `raw_estimators`; the calibrated wrapper does not,
//! and explanations reach the forest through
//! [`CalibratedEnsemble::explainable_forest`], which checks the class index
//! first.

use serde::Deserialize;

use super::features::NUM_FEATURES;
use super::gbdt_model::BoostedMember;
use super::tree::{DecisionTree, Forest, TreeArrays};
use crate::error::{Artifact, ArtifactError, ExplainError};

/// Anything that maps a scaled feature row to a class distribution.
pub trait Estimator: Send + Sync {
    fn n_classes(&self) -> usize;

    /// Class probabilities for one scaled feature row. Non-negative, sums to 1.
    fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

    /// The walkable tree members behind this estimator, if any.
    fn raw_estimators(&self) -> Option<&Forest> {
        None
    }
}

/// Scale a non-negative vector to sum to 1; uniform when it sums to 0.
pub(crate) fn normalise(mut v: Vec<f64>) -> Vec<f64> {
    let total: f64 = v.iter().sum();
    if total > 0.0 && total.is_finite() {
        v.iter_mut().for_each(|p| *p /= total);
    } else if !v.is_empty() {
        let uniform = 1.0 / v.len() as f64;
        v.iter_mut().for_each(|p| *p = uniform);
    }
    v
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct VotingEnsemble {
    forest: Forest,
    boosted: BoostedMember,
    /// `[forest, boosted]`, normalised to sum to 1.
    weights: [f64; 2],
}

impl VotingEnsemble {
    pub(crate) fn new(
        forest: Forest,
        boosted: BoostedMember,
        weights: [f64; 2],
    ) -> Result<Self, ArtifactError> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                "voting weights must be finite and non-negative",
            ));
        }
        let total = weights[0] + weights[1];
        if total <= 0.0 {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                "voting weights sum to zero",
            ));
        }
        if forest.n_classes() != boosted.n_classes() {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                format!(
                    "forest predicts {} classes, boosted member {}",
                    forest.n_classes(),
                    boosted.n_classes()
                ),
            ));
        }
        Ok(Self {
            forest,
            boosted,
            weights: [weights[0] / total, weights[1] / total],
        })
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn boosted(&self) -> &BoostedMember {
        &self.boosted
    }

    pub fn weights(&self) -> [f64; 2] {
        self.weights
    }
}

impl Estimator for VotingEnsemble {
    fn n_classes(&self) -> usize {
        self.forest.n_classes()
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let f = self.forest.predict_proba(x);
        let b = self.boosted.predict_proba(x);
        f.iter()
            .zip(&b)
            .map(|(pf, pb)| self.weights[0] * pf + self.weights[1] * pb)
            .collect()
    }

    fn raw_estimators(&self) -> Option<&Forest> {
        self.forest.raw_estimators()
    }
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Platt scaling for one class: `p = 1 / (1 + exp(a * s + b))`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigmoidCalibrator {
    pub a: f64,
    pub b: f64,
}

impl SigmoidCalibrator {
    pub fn apply(&self, score: f64) -> f64 {
        1.0 / (1.0 + (self.a * score + self.b).exp())
    }
}

pub struct CalibratedEnsemble {
    inner: VotingEnsemble,
    calibrators: Vec<SigmoidCalibrator>,
}

impl std::fmt::Debug for CalibratedEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibratedEnsemble")
            .field("inner", &self.inner)
            .field("calibrators", &self.calibrators.len())
            .finish()
    }
}

impl CalibratedEnsemble {
    pub(crate) fn new(
        inner: VotingEnsemble,
        calibrators: Vec<SigmoidCalibrator>,
    ) -> Result<Self, ArtifactError> {
        if calibrators.len() != inner.n_classes() {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                format!(
                    "{} calibrators for {} classes",
                    calibrators.len(),
                    inner.n_classes()
                ),
            ));
        }
        if calibrators
            .iter()
            .any(|c| !c.a.is_finite() || !c.b.is_finite())
        {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                "calibrator parameters must be finite",
            ));
        }
        Ok(Self { inner, calibrators })
    }

    /// The uncalibrated voting ensemble.
    pub fn inner(&self) -> &VotingEnsemble {
        &self.inner
    }

    /// Forest to explain `class` against.
    ///
    /// The class index is checked against both the calibrator count and the
    /// forest's own class count before any tree is touched.
    pub fn explainable_forest(&self, class: usize) -> Result<&Forest, ExplainError> {
        let n_classes = self.calibrators.len().min(self.inner.n_classes());
        if class >= n_classes {
            return Err(ExplainError::ClassIndexOutOfBounds {
                index: class,
                n_classes,
            });
        }
        let forest = self
            .inner
            .raw_estimators()
            .ok_or(ExplainError::NoTreeEnsemble)?;
        if forest.trees().is_empty() || forest.n_classes() <= class {
            return Err(ExplainError::NoTreeEnsemble);
        }
        Ok(forest)
    }
}

impl Estimator for CalibratedEnsemble {
    fn n_classes(&self) -> usize {
        self.calibrators.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let scores = self.inner.predict_proba(x);
        let calibrated = scores
            .iter()
            .zip(&self.calibrators)
            .map(|(s, c)| {
                let p = c.apply(*s);
                if p.is_finite() {
                    p
                } else {
                    0.0
                }
            })
            .collect();
        normalise(calibrated)
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VotingFile {
    weights: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForestFile {
    trees: Vec<TreeArrays>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoostedFile {
    models: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalibrationFile {
    method: String,
    classes: Vec<SigmoidCalibrator>,
}

/// On-disk shape of `ensemble.json`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EnsembleFile {
    n_features: usize,
    n_classes: usize,
    voting: VotingFile,
    forest: ForestFile,
    boosted: BoostedFile,
    calibration: CalibrationFile,
}

impl CalibratedEnsemble {
    pub(crate) fn from_file(file: EnsembleFile) -> Result<Self, ArtifactError> {
        let n_classes = file.n_classes;
        if file.n_features != NUM_FEATURES {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                format!(
                    "fitted on {} features, extractor produces {NUM_FEATURES}",
                    file.n_features
                ),
            ));
        }
        if n_classes == 0 {
            return Err(ArtifactError::invalid(Artifact::Ensemble, "no classes"));
        }
        if file.calibration.method != "sigmoid" {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                format!(
                    "calibration method '{}' is not supported",
                    file.calibration.method
                ),
            ));
        }
        if file.boosted.models.len() != n_classes {
            return Err(ArtifactError::invalid(
                Artifact::Ensemble,
                format!(
                    "{} boosted models for {n_classes} classes",
                    file.boosted.models.len()
                ),
            ));
        }

        let trees = file
            .forest
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, arrays)| {
                DecisionTree::from_arrays(arrays, n_classes).map_err(|e| {
                    ArtifactError::invalid(Artifact::Ensemble, format!("tree {i}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let forest = Forest::new(trees, n_classes)?;
        let boosted = BoostedMember::from_json(file.boosted.models)?;
        let voting = VotingEnsemble::new(forest, boosted, file.voting.weights)?;
        Self::new(voting, file.calibration.classes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::gbdt_model::tests::fitted;
    use crate::classifier::tree::tests::stump;

    /// Three-class calibrated ensemble: two stumps on feature 0 and 1 plus
    /// the boosted fixture.
    pub(crate) fn small_ensemble() -> CalibratedEnsemble {
        let trees = vec![
            DecisionTree::from_arrays(stump(0, 1.0, 3), 3).unwrap(),
            DecisionTree::from_arrays(stump(1, 0.0, 3), 3).unwrap(),
        ];
        let forest = Forest::new(trees, 3).unwrap();
        let voting = VotingEnsemble::new(forest, fitted(), [2.0, 1.0]).unwrap();
        let calibrators = vec![SigmoidCalibrator { a: -4.0, b: 1.5 }; 3];
        CalibratedEnsemble::new(voting, calibrators).unwrap()
    }

    #[test]
    fn test_normalise() {
        assert_eq!(normalise(vec![1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalise(vec![0.0, 0.0, 0.0, 0.0]), vec![0.25; 4]);
        assert!(normalise(vec![]).is_empty());
    }

    #[test]
    fn test_voting_weights_normalised() {
        let ensemble = small_ensemble();
        let w = ensemble.inner().weights();
        assert!((w[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((w[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_calibrated_proba_is_distribution() {
        let ensemble = small_ensemble();
        for v in [-3.0, 0.0, 0.7, 2.5, 5.0] {
            let x = [v; NUM_FEATURES];
            let p = ensemble.predict_proba(&x);
            assert_eq!(p.len(), 3);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(p.iter().all(|q| (0.0..=1.0).contains(q)));
        }
    }

    #[test]
    fn test_calibration_is_monotone() {
        let c = SigmoidCalibrator { a: -4.0, b: 1.5 };
        assert!(c.apply(0.9) > c.apply(0.5));
        assert!(c.apply(0.5) > c.apply(0.1));
    }

    #[test]
    fn test_wrapper_hides_trees() {
        let ensemble = small_ensemble();
        assert!(ensemble.raw_estimators().is_none());
        assert!(ensemble.inner().raw_estimators().is_some());
    }

    #[test]
    fn test_explainable_forest_checks_class_index() {
        let ensemble = small_ensemble();
        assert!(ensemble.explainable_forest(2).is_ok());
        assert_eq!(
            ensemble.explainable_forest(3).unwrap_err(),
            ExplainError::ClassIndexOutOfBounds {
                index: 3,
                n_classes: 3
            }
        );
    }

    #[test]
    fn test_rejects_mismatched_calibrators_and_weights() {
        let e = small_ensemble();
        let CalibratedEnsemble { inner, .. } = e;
        assert!(CalibratedEnsemble::new(inner, vec![SigmoidCalibrator { a: -1.0, b: 0.0 }; 2]).is_err());

        let trees = vec![DecisionTree::from_arrays(stump(0, 1.0, 3), 3).unwrap()];
        let forest = Forest::new(trees, 3).unwrap();
        assert!(VotingEnsemble::new(forest, fitted(), [0.0, 0.0]).is_err());
    }
}
