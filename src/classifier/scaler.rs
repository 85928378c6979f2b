//! Frozen standard scaler
//!
//! `z = (x - mean) / scale`, with a zero scale treated as 1 so constant
//! training columns pass through centred.

use serde::Deserialize;

use super::features::{FeatureVector, FEATURE_NAMES, NUM_FEATURES};
use crate::error::{Artifact, ArtifactError};

/// On-disk shape of `scaler.json`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScalerFile {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    mean: [f64; NUM_FEATURES],
    scale: [f64; NUM_FEATURES],
}

fn column(name: &str, values: &[f64]) -> Result<[f64; NUM_FEATURES], ArtifactError> {
    if values.len() != NUM_FEATURES {
        return Err(ArtifactError::invalid(
            Artifact::Scaler,
            format!(
                "{name} has {} entries, expected {NUM_FEATURES}",
                values.len()
            ),
        ));
    }
    let mut out = [0.0; NUM_FEATURES];
    for (i, v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(ArtifactError::invalid(
                Artifact::Scaler,
                format!("{name}[{i}] is not finite"),
            ));
        }
        out[i] = *v;
    }
    Ok(out)
}

impl FeatureScaler {
    pub(crate) fn from_file(file: ScalerFile) -> Result<Self, ArtifactError> {
        if file.feature_names.len() != NUM_FEATURES {
            return Err(ArtifactError::invalid(
                Artifact::Scaler,
                format!(
                    "fitted on {} features, extractor produces {NUM_FEATURES}",
                    file.feature_names.len()
                ),
            ));
        }
        if let Some(i) = file
            .feature_names
            .iter()
            .zip(FEATURE_NAMES.iter())
            .position(|(got, want)| got != want)
        {
            return Err(ArtifactError::invalid(
                Artifact::Scaler,
                format!(
                    "feature {i} is '{}', extractor produces '{}'",
                    file.feature_names[i], FEATURE_NAMES[i]
                ),
            ));
        }
        Self::new(column("mean", &file.mean)?, column("scale", &file.scale)?)
    }

    pub(crate) fn new(
        mean: [f64; NUM_FEATURES],
        scale: [f64; NUM_FEATURES],
    ) -> Result<Self, ArtifactError> {
        if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s < 0.0) {
            return Err(ArtifactError::invalid(
                Artifact::Scaler,
                format!("scale[{i}] must be finite and non-negative"),
            ));
        }
        let scale = scale.map(|s| if s == 0.0 { 1.0 } else { s });
        Ok(Self { mean, scale })
    }

    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            mean: [0.0; NUM_FEATURES],
            scale: [1.0; NUM_FEATURES],
        }
    }

    pub fn transform(&self, features: &FeatureVector) -> [f64; NUM_FEATURES] {
        let mut out = features.values;
        for (i, v) in out.iter_mut().enumerate() {
            *v = (*v - self.mean[i]) / self.scale[i];
        }
        out
    }

    /// Map a value in scaled units back to the raw units of feature `index`.
    pub fn unscale(&self, index: usize, scaled: f64) -> f64 {
        scaled * self.scale[index] + self.mean[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> ScalerFile {
        ScalerFile {
            feature_names: names,
            mean,
            scale,
        }
    }

    fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_transform_and_unscale() {
        let mut mean = vec![0.0; NUM_FEATURES];
        let mut scale = vec![1.0; NUM_FEATURES];
        mean[0] = 12.0;
        scale[0] = 2.0;
        scale[1] = 0.0;
        let scaler = FeatureScaler::from_file(file(names(), mean, scale)).unwrap();

        let mut values = [0.0; NUM_FEATURES];
        values[0] = 15.0;
        values[1] = 4.0;
        let z = scaler.transform(&FeatureVector::new(values));
        assert_eq!(z[0], 1.5);
        // zero scale treated as 1
        assert_eq!(z[1], 4.0);
        assert_eq!(scaler.unscale(0, 1.5), 15.0);
    }

    #[test]
    fn test_rejects_reordered_names() {
        let mut n = names();
        n.swap(0, 1);
        let err = FeatureScaler::from_file(file(
            n,
            vec![0.0; NUM_FEATURES],
            vec![1.0; NUM_FEATURES],
        ))
        .unwrap_err();
        assert!(err.to_string().contains("feature 0"), "got: {err}");
    }

    #[test]
    fn test_rejects_wrong_width_and_non_finite() {
        let short = file(names()[..40].to_vec(), vec![0.0; 40], vec![1.0; 40]);
        assert!(FeatureScaler::from_file(short).is_err());

        let mut mean = vec![0.0; NUM_FEATURES];
        mean[3] = f64::NAN;
        assert!(FeatureScaler::from_file(file(names(), mean, vec![1.0; NUM_FEATURES])).is_err());
    }
}
