//! Chandas - Sanskrit meter identification
//!
//! Turns a Devanagari verse into its laghu/guru weight pattern, derives a
//! fixed vector of prosodic features, and predicts the meter with a frozen,
//! calibrated tree ensemble. Predictions can be explained with TreeSHAP
//! attributions, decision paths and counterfactual nudges.
//!
//! ```no_run
//! use std::sync::Arc;
//! use chandas::{classify, ModelContext};
//!
//! let ctx = Arc::new(ModelContext::load("models".as_ref())?);
//! let outcome = classify(&ctx, "धर्मक्षेत्रे कुरुक्षेत्रे समवेता युयुत्सवः", 3, true)?;
//! println!("{} -> {}", outcome.pattern, outcome.prediction.best.label);
//! # Ok::<(), chandas::ChandasError>(())
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod explain;
pub mod pipeline;
pub mod prosody;

pub use classifier::{FeatureVector, ModelContext, ModelPaths, PredictionResult, FEATURE_NAMES};
pub use config::ChandasConfig;
pub use error::{ChandasError, ErrorKind, ExplainError};
pub use explain::{Explanation, ExplanationStatus};
pub use pipeline::{classify, ClassificationOutcome, ClassifyRequest, Pipeline, PipelineOptions};
pub use prosody::{ProsodyPattern, SyllableWeight};
