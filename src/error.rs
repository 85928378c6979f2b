//! Error taxonomy for the classification core
//!
//! Request errors (`InvalidInput`, `UnparsableText`) abort the pipeline for
//! that verse only. `ModelUnavailable` is a startup failure: a process that
//! hits it must not serve classifications. Explanation failures live in
//! [`ExplainError`] and never escape `classify`; they are folded into the
//! outcome instead.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Stable machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnparsableText,
    ModelUnavailable,
    ExplanationUnavailable,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UnparsableText => "unparsable_text",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::ExplanationUnavailable => "explanation_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the classification pipeline and the model loader.
#[derive(Debug, Error)]
pub enum ChandasError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("unparsable text: {reason}")]
    UnparsableText { reason: String },

    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },
}

impl ChandasError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn unparsable(reason: impl Into<String>) -> Self {
        Self::UnparsableText {
            reason: reason.into(),
        }
    }

    pub(crate) fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChandasError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ChandasError::UnparsableText { .. } => ErrorKind::UnparsableText,
            ChandasError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
        }
    }
}

/// Why an explanation could not be produced. Non-fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplainError {
    #[error("class index {index} is out of bounds for {n_classes} classes")]
    ClassIndexOutOfBounds { index: usize, n_classes: usize },

    #[error("the ensemble exposes no tree estimators")]
    NoTreeEnsemble,

    #[error("tree {tree} has an unexpected structure at node {node}")]
    MalformedTree { tree: usize, node: usize },

    #[error("attribution for feature {feature} is not finite")]
    NonFiniteAttribution { feature: &'static str },
}

impl ExplainError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExplanationUnavailable
    }
}

/// Which frozen artifact a load failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Labels,
    Scaler,
    Ensemble,
}

impl Artifact {
    pub fn describe(self) -> &'static str {
        match self {
            Artifact::Labels => "label table",
            Artifact::Scaler => "feature scaler",
            Artifact::Ensemble => "tree ensemble",
        }
    }
}

/// Loader-internal error. Carries the path for logs; converted into a
/// path-free `ModelUnavailable` before it leaves the crate.
#[derive(Debug, Error)]
pub(crate) enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    Invalid { artifact: Artifact, message: String },
}

impl ArtifactError {
    pub(crate) fn invalid(artifact: Artifact, message: impl Into<String>) -> Self {
        Self::Invalid {
            artifact,
            message: message.into(),
        }
    }

    fn artifact(&self) -> Artifact {
        match self {
            ArtifactError::Io { artifact, .. }
            | ArtifactError::Json { artifact, .. }
            | ArtifactError::Invalid { artifact, .. } => *artifact,
        }
    }
}

impl From<ArtifactError> for ChandasError {
    fn from(err: ArtifactError) -> Self {
        tracing::error!(error = %err, "frozen artifact failed to load");
        let what = err.artifact().describe();
        let reason = match &err {
            ArtifactError::Io { .. } => format!("{what} could not be read"),
            ArtifactError::Json { .. } => format!("{what} is not valid JSON for its schema"),
            ArtifactError::Invalid { message, .. } => format!("{what} is inconsistent: {message}"),
        };
        ChandasError::model_unavailable(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_snake_case() {
        assert_eq!(ChandasError::invalid_input("x").kind().as_str(), "invalid_input");
        assert_eq!(ChandasError::unparsable("x").kind().as_str(), "unparsable_text");
        assert_eq!(
            ChandasError::model_unavailable("x").kind().as_str(),
            "model_unavailable"
        );
        assert_eq!(
            ExplainError::NoTreeEnsemble.kind().as_str(),
            "explanation_unavailable"
        );
    }

    #[test]
    fn artifact_errors_hide_paths() {
        let err = ArtifactError::Io {
            artifact: Artifact::Scaler,
            path: PathBuf::from("/srv/secret/models/scaler.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let public: ChandasError = err.into();
        let message = public.to_string();
        assert_eq!(public.kind(), ErrorKind::ModelUnavailable);
        assert!(message.contains("feature scaler"), "got: {message}");
        assert!(!message.contains("/srv/secret"), "path leaked: {message}");
    }
}
