//! Layered configuration for chandas
//!
//! Supports loading config from, lowest priority first:
//! - built-in defaults
//! - ~/.config/chandas/config.toml
//! - ./chandas.toml
//! - an explicit `--config` file
//! - environment variables (`CHANDAS_MODEL_DIR`, `CHANDAS_MAX_CHARS`)
//!
//! Every file layer is optional and sparse; unknown keys are an error so a
//! typo never silently falls back to a default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::context::{
    ModelPaths, DEFAULT_ENSEMBLE_FILE, DEFAULT_LABELS_FILE, DEFAULT_SCALER_FILE,
};
use crate::explain::ExplainOptions;
use crate::pipeline::{PipelineOptions, DEFAULT_TOP_K};
use crate::prosody::{FinalSyllablePolicy, ProsodyOptions, DEFAULT_MAX_CHARS};

pub const PROJECT_CONFIG_FILE: &str = "chandas.toml";
pub const ENV_MODEL_DIR: &str = "CHANDAS_MODEL_DIR";
pub const ENV_MAX_CHARS: &str = "CHANDAS_MAX_CHARS";

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChandasConfig {
    pub model: ModelConfig,
    pub input: InputConfig,
    pub prosody: ProsodyConfig,
    pub predict: PredictConfig,
    pub explain: ExplainConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub dir: PathBuf,
    pub labels_file: String,
    pub scaler_file: String,
    pub ensemble_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputConfig {
    pub max_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProsodyConfig {
    pub final_syllable: FinalSyllablePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainConfig {
    pub enabled: bool,
    pub top_features: usize,
    pub sampled_trees: usize,
    pub seed: u64,
    pub counterfactuals: usize,
}

impl Default for ChandasConfig {
    fn default() -> Self {
        let explain = ExplainOptions::default();
        Self {
            model: ModelConfig {
                dir: PathBuf::from("models"),
                labels_file: DEFAULT_LABELS_FILE.into(),
                scaler_file: DEFAULT_SCALER_FILE.into(),
                ensemble_file: DEFAULT_ENSEMBLE_FILE.into(),
            },
            input: InputConfig {
                max_chars: DEFAULT_MAX_CHARS,
            },
            prosody: ProsodyConfig {
                final_syllable: FinalSyllablePolicy::default(),
            },
            predict: PredictConfig { top_k: DEFAULT_TOP_K },
            explain: ExplainConfig {
                enabled: true,
                top_features: explain.top_features,
                sampled_trees: explain.sampled_trees,
                seed: explain.seed,
                counterfactuals: explain.counterfactuals,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// File layer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub input: InputSection,
    #[serde(default)]
    pub prosody: ProsodySection,
    #[serde(default)]
    pub predict: PredictSection,
    #[serde(default)]
    pub explain: ExplainSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    pub dir: Option<PathBuf>,
    pub labels_file: Option<String>,
    pub scaler_file: Option<String>,
    pub ensemble_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSection {
    pub max_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProsodySection {
    pub final_syllable: Option<FinalSyllablePolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictSection {
    pub top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplainSection {
    pub enabled: Option<bool>,
    pub top_features: Option<usize>,
    pub sampled_trees: Option<usize>,
    pub seed: Option<u64>,
    pub counterfactuals: Option<usize>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

impl ChandasConfig {
    /// Load config from all sources. `explicit` is the `--config` file, which
    /// must exist when given; the other files are skipped when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = ChandasConfig::default();

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            config.merge(Self::read_file(&path)?);
        }
        let project = PathBuf::from(PROJECT_CONFIG_FILE);
        if project.exists() {
            config.merge(Self::read_file(&project)?);
        }
        if let Some(path) = explicit {
            config.merge(Self::read_file(path)?);
        }

        // Environment variables override everything
        if let Ok(dir) = std::env::var(ENV_MODEL_DIR) {
            config.model.dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(ENV_MAX_CHARS) {
            config.input.max_chars = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_CHARS}={raw:?} is not a number"))?;
        }

        config.validate()?;
        tracing::debug!(model_dir = %config.model.dir.display(), "configuration loaded");
        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chandas").join("config.toml"))
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<ConfigFile> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay a file layer; only keys present in `other` change.
    pub fn merge(&mut self, other: ConfigFile) {
        set(&mut self.model.dir, other.model.dir);
        set(&mut self.model.labels_file, other.model.labels_file);
        set(&mut self.model.scaler_file, other.model.scaler_file);
        set(&mut self.model.ensemble_file, other.model.ensemble_file);
        set(&mut self.input.max_chars, other.input.max_chars);
        set(&mut self.prosody.final_syllable, other.prosody.final_syllable);
        set(&mut self.predict.top_k, other.predict.top_k);
        set(&mut self.explain.enabled, other.explain.enabled);
        set(&mut self.explain.top_features, other.explain.top_features);
        set(&mut self.explain.sampled_trees, other.explain.sampled_trees);
        set(&mut self.explain.seed, other.explain.seed);
        set(&mut self.explain.counterfactuals, other.explain.counterfactuals);
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.max_chars == 0 {
            anyhow::bail!("input.max_chars must be at least 1");
        }
        for (key, name) in [
            ("model.labels_file", &self.model.labels_file),
            ("model.scaler_file", &self.model.scaler_file),
            ("model.ensemble_file", &self.model.ensemble_file),
        ] {
            if name.trim().is_empty() {
                anyhow::bail!("{key} must not be empty");
            }
        }
        Ok(())
    }

    pub fn model_paths(&self) -> ModelPaths {
        let dir = &self.model.dir;
        ModelPaths {
            labels: dir.join(&self.model.labels_file),
            scaler: dir.join(&self.model.scaler_file),
            ensemble: dir.join(&self.model.ensemble_file),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            prosody: ProsodyOptions {
                max_chars: self.input.max_chars,
                final_syllable: self.prosody.final_syllable,
            },
            top_k: self.predict.top_k,
            explain_enabled: self.explain.enabled,
            explain: ExplainOptions {
                top_features: self.explain.top_features,
                sampled_trees: self.explain.sampled_trees,
                seed: self.explain.seed,
                counterfactuals: self.explain.counterfactuals,
            },
        }
    }
}
