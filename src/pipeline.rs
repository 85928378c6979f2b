//! The `classify` operation: text → pattern → features → prediction →
//! explanation.
//!
//! Each call is self-contained and only reads the shared [`ModelContext`].
//! Prosody errors abort the call; explanation errors are folded into the
//! outcome as [`ExplanationStatus::Unavailable`].

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::classifier::{extract, FeatureVector, ModelContext, PredictionResult};
use crate::error::{ChandasError, ErrorKind};
use crate::explain::{self, ExplainOptions, ExplanationStatus};
use crate::prosody::{scan, ProsodyOptions, ProsodyPattern};

/// Patterns shorter than this get a reliability note.
pub const SHORT_VERSE_SYLLABLES: usize = 12;

/// Default number of alternatives returned alongside the best class.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub prosody: ProsodyOptions,
    /// Alternatives to list when the caller does not ask for a count.
    pub top_k: usize,
    /// When false, explanation requests are answered with
    /// [`ExplanationStatus::Skipped`].
    pub explain_enabled: bool,
    pub explain: ExplainOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            prosody: ProsodyOptions::default(),
            top_k: DEFAULT_TOP_K,
            explain_enabled: true,
            explain: ExplainOptions::default(),
        }
    }
}

/// One classification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest<'a> {
    pub text: &'a str,
    pub top_k: usize,
    pub explain: bool,
    /// Class to explain instead of the best one.
    pub explain_class: Option<usize>,
}

impl<'a> ClassifyRequest<'a> {
    pub fn new(text: &'a str, top_k: usize, explain: bool) -> Self {
        Self {
            text,
            top_k,
            explain,
            explain_class: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationOutcome {
    pub pattern: ProsodyPattern,
    pub syllable_count: usize,
    pub pada_lengths: Vec<usize>,
    pub features: FeatureVector,
    pub prediction: PredictionResult,
    pub explanation: ExplanationStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// A loaded model plus the options every request runs with.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: Arc<ModelContext>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(ctx: Arc<ModelContext>, options: PipelineOptions) -> Self {
        Self { ctx, options }
    }

    pub fn context(&self) -> &ModelContext {
        &self.ctx
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn classify(
        &self,
        text: &str,
        top_k: usize,
        explain: bool,
    ) -> Result<ClassificationOutcome, ChandasError> {
        self.run(&ClassifyRequest::new(text, top_k, explain))
    }

    pub fn run(&self, request: &ClassifyRequest<'_>) -> Result<ClassificationOutcome, ChandasError> {
        let scansion = scan(request.text, &self.options.prosody)?;
        let features = extract(scansion.pattern());
        if !features.is_finite() {
            return Err(ChandasError::unparsable("pattern produced non-finite features"));
        }
        let prediction = self.ctx.predict(&features, request.top_k);

        let explanation = if !request.explain {
            ExplanationStatus::NotRequested
        } else if !self.options.explain_enabled {
            tracing::warn!("explanation requested but disabled in configuration");
            ExplanationStatus::Skipped {
                reason: "explanations are disabled in configuration".into(),
            }
        } else {
            let class = request.explain_class.unwrap_or(prediction.best.index);
            let status: ExplanationStatus =
                explain::explain(&self.ctx, &features, class, &self.options.explain).into();
            if let ExplanationStatus::Unavailable { reason, .. } = &status {
                tracing::warn!(class, %reason, "explanation unavailable");
            }
            status
        };

        let pattern = scansion.pattern().clone();
        let mut notes = Vec::new();
        if pattern.len() < SHORT_VERSE_SYLLABLES {
            notes.push(format!(
                "Short verse detected ({} syllables). Confidence may be lower for short patterns.",
                pattern.len()
            ));
        }

        Ok(ClassificationOutcome {
            syllable_count: pattern.len(),
            pada_lengths: scansion.pada_lengths(),
            pattern,
            features,
            prediction,
            explanation,
            notes,
        })
    }

    /// Classify many verses in parallel. Results keep input order; one
    /// failure does not affect the others.
    pub fn classify_batch<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
        top_k: usize,
        explain: bool,
    ) -> BatchOutcome {
        let results: Vec<BatchItem> = texts
            .par_iter()
            .map(|text| {
                let text = text.as_ref();
                let result = self
                    .classify(text, top_k, explain)
                    .map_err(|e| BatchError {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                BatchItem {
                    verse: text.to_string(),
                    result,
                }
            })
            .collect();

        let successful = results.iter().filter(|r| r.result.is_ok()).count();
        let summary = BatchSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        };
        tracing::debug!(
            total = summary.total,
            failed = summary.failed,
            "batch classified"
        );
        BatchOutcome { results, summary }
    }
}

/// Classify one verse with default options.
pub fn classify(
    ctx: &Arc<ModelContext>,
    text: &str,
    top_k: usize,
    explain: bool,
) -> Result<ClassificationOutcome, ChandasError> {
    Pipeline::new(Arc::clone(ctx), PipelineOptions::default()).classify(text, top_k, explain)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub verse: String,
    #[serde(with = "batch_result")]
    pub result: Result<ClassificationOutcome, BatchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

/// `{"ok": outcome}` / `{"error": {kind, message}}`.
mod batch_result {
    use serde::ser::{SerializeMap, Serializer};

    use super::{BatchError, ClassificationOutcome};

    pub fn serialize<S: Serializer>(
        result: &Result<ClassificationOutcome, BatchError>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match result {
            Ok(outcome) => map.serialize_entry("ok", outcome)?,
            Err(err) => map.serialize_entry("error", err)?,
        }
        map.end()
    }
}
