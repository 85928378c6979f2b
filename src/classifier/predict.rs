//! Ranked prediction over the label table

use serde::Serialize;

use super::context::ModelContext;
use super::features::FeatureVector;

/// Probability at or above which the best class is reported as `high`.
pub const HIGH_CONFIDENCE: f64 = 0.60;
/// Probability at or above which the best class is reported as `medium`.
pub const MEDIUM_CONFIDENCE: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_probability(p: f64) -> Self {
        if p >= HIGH_CONFIDENCE {
            Self::High
        } else if p >= MEDIUM_CONFIDENCE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One class with its calibrated probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPrediction {
    pub label: String,
    pub index: usize,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub best: ClassPrediction,
    /// The `top_k` runners-up, most probable first.
    pub alternatives: Vec<ClassPrediction>,
    /// Every class, most probable first. Sums to 1.
    pub distribution: Vec<ClassPrediction>,
    pub confidence: ConfidenceLevel,
    pub threshold_met: bool,
}

impl ModelContext {
    /// Rank all classes for one feature vector.
    pub fn predict(&self, features: &FeatureVector, top_k: usize) -> PredictionResult {
        let proba = self.predict_proba(features);
        let mut distribution: Vec<ClassPrediction> = proba
            .iter()
            .enumerate()
            .map(|(index, &probability)| ClassPrediction {
                label: self.labels().name(index).unwrap_or_default().to_string(),
                index,
                probability,
            })
            .collect();
        // ties keep class-index order
        distribution.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then(a.index.cmp(&b.index))
        });

        let best = distribution[0].clone();
        let alternatives = distribution.iter().skip(1).take(top_k).cloned().collect();
        let confidence = ConfidenceLevel::from_probability(best.probability);
        tracing::debug!(
            best = %best.label,
            probability = best.probability,
            confidence = confidence.as_str(),
            "prediction"
        );
        PredictionResult {
            best,
            alternatives,
            distribution,
            confidence,
            threshold_met: confidence != ConfidenceLevel::Low,
        }
    }
}
