//! Frozen model context
//!
//! Loaded once at startup, immutable afterwards, shared across threads
//! behind an `Arc`. Every cross-artifact invariant is checked here so a
//! context that exists can always predict.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::ensemble::{CalibratedEnsemble, EnsembleFile, Estimator};
use super::features::{FeatureVector, NUM_FEATURES};
use super::labels::{LabelFile, LabelTable};
use super::scaler::{FeatureScaler, ScalerFile};
use crate::error::{Artifact, ArtifactError, ChandasError};

pub const DEFAULT_LABELS_FILE: &str = "labels.json";
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";
pub const DEFAULT_ENSEMBLE_FILE: &str = "ensemble.json";

/// Locations of the three frozen artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub labels: PathBuf,
    pub scaler: PathBuf,
    pub ensemble: PathBuf,
}

impl ModelPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            labels: dir.join(DEFAULT_LABELS_FILE),
            scaler: dir.join(DEFAULT_SCALER_FILE),
            ensemble: dir.join(DEFAULT_ENSEMBLE_FILE),
        }
    }
}

fn read_json<T: DeserializeOwned>(artifact: Artifact, path: &Path) -> Result<T, ArtifactError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ArtifactError::Json {
        artifact,
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug)]
pub struct ModelContext {
    labels: LabelTable,
    scaler: FeatureScaler,
    ensemble: CalibratedEnsemble,
}

impl ModelContext {
    /// Load the artifacts from their default names inside `dir`.
    pub fn load(dir: &Path) -> Result<Self, ChandasError> {
        Self::load_from(&ModelPaths::in_dir(dir))
    }

    pub fn load_from(paths: &ModelPaths) -> Result<Self, ChandasError> {
        let labels = LabelTable::from_file(read_json::<LabelFile>(Artifact::Labels, &paths.labels)?)?;
        let scaler =
            FeatureScaler::from_file(read_json::<ScalerFile>(Artifact::Scaler, &paths.scaler)?)?;
        let ensemble = CalibratedEnsemble::from_file(read_json::<EnsembleFile>(
            Artifact::Ensemble,
            &paths.ensemble,
        )?)?;
        let context = Self::from_parts(labels, scaler, ensemble)?;

        tracing::info!(
            classes = context.labels.len(),
            features = NUM_FEATURES,
            trees = context.ensemble.inner().forest().trees().len(),
            "model context loaded"
        );
        Ok(context)
    }

    pub(crate) fn from_parts(
        labels: LabelTable,
        scaler: FeatureScaler,
        ensemble: CalibratedEnsemble,
    ) -> Result<Self, ArtifactError> {
        if labels.len() != ensemble.n_classes() {
            return Err(ArtifactError::invalid(
                Artifact::Labels,
                format!(
                    "{} labels but the ensemble predicts {} classes",
                    labels.len(),
                    ensemble.n_classes()
                ),
            ));
        }
        Ok(Self {
            labels,
            scaler,
            ensemble,
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn ensemble(&self) -> &CalibratedEnsemble {
        &self.ensemble
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Full calibrated distribution over all classes, in class-index order.
    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        let scaled = self.scaler.transform(features);
        self.ensemble.predict_proba(&scaled)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::ensemble::tests::small_ensemble;
    use crate::classifier::features::extract;

    pub(crate) fn small_context() -> ModelContext {
        let labels = LabelTable::new(vec![
            "अनुष्टुभ्".into(),
            "इन्द्रवज्रा".into(),
            "मालिनी".into(),
        ])
        .unwrap();
        ModelContext::from_parts(labels, FeatureScaler::identity(), small_ensemble()).unwrap()
    }

    #[test]
    fn test_label_count_must_match() {
        let labels = LabelTable::new(vec!["a".into(), "b".into()]).unwrap();
        let err =
            ModelContext::from_parts(labels, FeatureScaler::identity(), small_ensemble())
                .unwrap_err();
        assert!(err.to_string().contains("2 labels"), "got: {err}");
    }

    #[test]
    fn test_predict_proba_sums_to_one() {
        let ctx = small_context();
        let p = ctx.predict_proba(&extract(&"GGLGGLLGLGG".parse().unwrap()));
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_dir_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelContext::load(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelUnavailable);
        assert!(err.to_string().contains("label table"));
    }
}
