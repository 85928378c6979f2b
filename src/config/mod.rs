//! Configuration module for chandas
//!
//! This module handles:
//! - Model artifact locations
//! - Input limits and the final-syllable policy
//! - Prediction and explanation defaults

mod user_config;

pub use user_config::{
    ChandasConfig, ConfigFile, ExplainConfig, InputConfig, ModelConfig, PredictConfig,
    ProsodyConfig, ENV_MAX_CHARS, ENV_MODEL_DIR, PROJECT_CONFIG_FILE,
};
