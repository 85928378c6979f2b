//! Feature engineering and the frozen meter classifier
//!
//! Pipeline: `ProsodyPattern` → [`features::extract`] (41 columns, fixed
//! order) → [`FeatureScaler`] → [`CalibratedEnsemble`] → [`PredictionResult`].
//!
//! All model state lives in a [`ModelContext`] that is loaded once and only
//! read afterwards.

pub mod context;
pub mod ensemble;
pub mod features;
pub mod gbdt_model;
pub mod labels;
pub mod predict;
pub mod scaler;
pub mod tree;

pub use context::{ModelContext, ModelPaths};
pub use ensemble::{CalibratedEnsemble, Estimator, SigmoidCalibrator, VotingEnsemble};
pub use features::{extract, feature_index, FeatureVector, FEATURE_NAMES, NUM_FEATURES};
pub use gbdt_model::BoostedMember;
pub use labels::{LabelTable, NUM_METERS};
pub use predict::{ClassPrediction, ConfidenceLevel, PredictionResult};
pub use scaler::FeatureScaler;
pub use tree::{DecisionTree, Forest, Node, TreeArrays};
