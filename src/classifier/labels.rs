//! Class index to meter name table

use serde::Deserialize;

use crate::error::{Artifact, ArtifactError};

/// Size of the closed meter label set a shipped model must cover.
pub const NUM_METERS: usize = 10;

/// On-disk shape of `labels.json`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LabelFile {
    pub labels: Vec<String>,
}

/// Meter names indexed by the class index the ensemble was fitted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Shipped label tables cover exactly [`NUM_METERS`] meters.
    pub(crate) fn from_file(file: LabelFile) -> Result<Self, ArtifactError> {
        if file.labels.len() != NUM_METERS {
            return Err(ArtifactError::invalid(
                Artifact::Labels,
                format!(
                    "{} labels, expected exactly {NUM_METERS} meters",
                    file.labels.len()
                ),
            ));
        }
        Self::new(file.labels)
    }

    pub(crate) fn new(labels: Vec<String>) -> Result<Self, ArtifactError> {
        if labels.is_empty() {
            return Err(ArtifactError::invalid(Artifact::Labels, "no labels"));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ArtifactError::invalid(
                    Artifact::Labels,
                    format!("label {i} is blank"),
                ));
            }
            if labels[..i].contains(label) {
                return Err(ArtifactError::invalid(
                    Artifact::Labels,
                    format!("label {i} duplicates an earlier entry"),
                ));
            }
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
