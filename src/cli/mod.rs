//! CLI command definitions and handlers

mod batch;
mod classify;
mod inspect;
mod scan;

use anyhow::{Context, Result};
use chandas::{ChandasConfig, ModelContext};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Parse and validate a top-k count (1-64)
fn parse_top_k(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("top-k must be at least 1".to_string())
    } else if n > 64 {
        Err("top-k cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Chandas - Sanskrit meter identification
#[derive(Parser, Debug)]
#[command(name = "chandas")]
#[command(
    version,
    about = "Identify the meter of a Devanagari verse from its laghu/guru pattern",
    long_about = "Chandas scans a Devanagari verse into its laghu (L) / guru (G) syllable \
pattern, derives 41 prosodic features and predicts the meter with a frozen, \
calibrated tree ensemble. Predictions can be explained with feature attributions, \
decision paths and counterfactual nudges.",
    after_help = "\
Examples:
  chandas pattern 'धर्मक्षेत्रे कुरुक्षेत्रे'            Scan a verse (no model needed)
  chandas classify 'धर्मक्षेत्रे कुरुक्षेत्रे' --explain   Predict and explain the meter
  chandas batch verses.txt --format json           Classify one verse per line
  chandas inspect --model-dir ./models             Check the model artifacts"
)]
pub struct Cli {
    /// Directory holding labels.json, scaler.json and ensemble.json
    #[arg(long, global = true, env = "CHANDAS_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Extra config file (applied after ~/.config/chandas/config.toml and ./chandas.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict the meter of one verse
    #[command(after_help = "\
Examples:
  chandas classify 'यो वै स परम ब्रह्म तस्य नाम सत्यम्।'
  chandas classify '...' --top-k 5 --format json
  chandas classify '...' --explain --explain-class 2")]
    Classify {
        /// Devanagari verse
        verse: String,

        /// Number of alternative meters to list (default: from config)
        #[arg(long, value_parser = parse_top_k)]
        top_k: Option<usize>,

        /// Attach an explanation of the prediction
        #[arg(long)]
        explain: bool,

        /// Explain this class index instead of the predicted one
        #[arg(long, requires = "explain")]
        explain_class: Option<usize>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Classify every non-empty line of a file in parallel
    Batch {
        /// File with one verse per line
        file: PathBuf,

        /// Number of alternative meters to list (default: from config)
        #[arg(long, value_parser = parse_top_k)]
        top_k: Option<usize>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Print the laghu/guru pattern and pada lengths (no model needed)
    Pattern {
        /// Devanagari verse
        verse: String,
    },

    /// Print the 41 named prosodic features (no model needed)
    Features {
        /// Devanagari verse
        verse: String,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Load the model artifacts and summarise them
    Inspect,
}

/// Resolve configuration, with `--model-dir` over every config layer.
fn load_config(cli: &Cli) -> Result<ChandasConfig> {
    let mut config = ChandasConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.model_dir {
        config.model.dir = dir.clone();
    }
    Ok(config)
}

fn load_model(config: &ChandasConfig) -> Result<Arc<ModelContext>> {
    let ctx = ModelContext::load_from(&config.model_paths()).with_context(|| {
        format!(
            "could not load the model from {}",
            config.model.dir.display()
        )
    })?;
    Ok(Arc::new(ctx))
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    tracing::debug!(?config, "resolved configuration");

    match cli.command {
        Commands::Classify {
            verse,
            top_k,
            explain,
            explain_class,
            format,
        } => {
            let ctx = load_model(&config)?;
            classify::run(
                ctx,
                &config,
                &verse,
                top_k,
                explain,
                explain_class,
                &format,
            )
        }
        Commands::Batch {
            file,
            top_k,
            format,
        } => {
            let ctx = load_model(&config)?;
            batch::run(ctx, &config, &file, top_k, &format)
        }
        Commands::Pattern { verse } => scan::pattern(&config, &verse),
        Commands::Features { verse, format } => scan::features(&config, &verse, &format),
        Commands::Inspect => inspect::run(&config),
    }
}
