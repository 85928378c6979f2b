//! What-if nudges that flip the predicted meter

use serde::Serialize;

use crate::classifier::{feature_index, FeatureVector, ModelContext};

struct Nudge {
    feature: &'static str,
    change: f64,
    description: &'static str,
}

const NUDGES: &[Nudge] = &[
    Nudge { feature: "guru_laghu_ratio", change: 0.1, description: "Increase guru ratio slightly" },
    Nudge { feature: "guru_laghu_ratio", change: -0.1, description: "Decrease guru ratio slightly" },
    Nudge { feature: "pattern_length", change: 1.0, description: "Add one syllable" },
    Nudge { feature: "pattern_length", change: -1.0, description: "Remove one syllable" },
    Nudge { feature: "glg_count", change: 1.0, description: "Add one G-L-G pattern" },
    Nudge { feature: "lgl_count", change: 1.0, description: "Add one L-G-L pattern" },
    Nudge { feature: "gg_count", change: 1.0, description: "Add one G-G bigram" },
    Nudge { feature: "ll_count", change: 1.0, description: "Add one L-L bigram" },
    Nudge { feature: "max_guru_run", change: 1.0, description: "Extend longest guru sequence" },
    Nudge { feature: "max_laghu_run", change: 1.0, description: "Extend longest laghu sequence" },
    Nudge { feature: "guru_percentage", change: 0.05, description: "Increase guru percentage" },
    Nudge { feature: "guru_percentage", change: -0.05, description: "Decrease guru percentage" },
];

const MAX_RATIO: f64 = 5.0;

/// A single-feature change that moves the prediction to another meter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterfactual {
    pub feature: &'static str,
    pub original_value: f64,
    pub new_value: f64,
    pub description: &'static str,
    pub original_label: String,
    pub new_label: String,
    pub new_probability: f64,
}

fn in_range(feature: &str, value: f64) -> bool {
    if value < 0.0 {
        return false;
    }
    if feature.contains("ratio") && value > MAX_RATIO {
        return false;
    }
    if feature.contains("percentage") && value > 1.0 {
        return false;
    }
    true
}

fn argmax(p: &[f64]) -> usize {
    p.iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Apply each nudge to the raw feature vector and keep those that move the
/// predicted meter away from the unmodified prediction, up to `max`.
///
/// The baseline is always the model's own argmax, whichever class the
/// surrounding explanation targets.
pub fn counterfactuals(ctx: &ModelContext, features: &FeatureVector, max: usize) -> Vec<Counterfactual> {
    let predicted = argmax(&ctx.predict_proba(features));
    let original_label = ctx.labels().name(predicted).unwrap_or_default();
    let mut found = Vec::new();

    for nudge in NUDGES {
        if found.len() >= max {
            break;
        }
        let Some(i) = feature_index(nudge.feature) else {
            continue;
        };
        let original_value = features.values[i];
        let new_value = original_value + nudge.change;
        if !in_range(nudge.feature, new_value) {
            continue;
        }

        let mut modified = features.clone();
        modified.values[i] = new_value;
        let proba = ctx.predict_proba(&modified);
        let new_class = argmax(&proba);
        if new_class != predicted {
            found.push(Counterfactual {
                feature: nudge.feature,
                original_value,
                new_value,
                description: nudge.description,
                original_label: original_label.to_string(),
                new_label: ctx.labels().name(new_class).unwrap_or_default().to_string(),
                new_probability: proba[new_class],
            });
        }
    }
    found
}
