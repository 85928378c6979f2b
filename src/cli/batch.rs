//! Batch command - classify one verse per line

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chandas::{ChandasConfig, ModelContext, Pipeline};
use console::style;

/// Non-empty, trimmed lines of `content`.
fn verses(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn run(
    ctx: Arc<ModelContext>,
    config: &ChandasConfig,
    file: &Path,
    top_k: Option<usize>,
    format: &str,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let verses = verses(&content);
    if verses.is_empty() {
        anyhow::bail!("{} contains no verses", file.display());
    }

    let pipeline = Pipeline::new(ctx, config.pipeline_options());
    let top_k = top_k.unwrap_or(pipeline.options().top_k);
    let batch = pipeline.classify_batch(&verses, top_k, false);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    for (i, item) in batch.results.iter().enumerate() {
        println!("\n{} {}", style(format!("[{}]", i + 1)).dim(), item.verse);
        match &item.result {
            Ok(outcome) => super::classify::print_outcome(outcome),
            Err(err) => println!("  {} {}", style(err.kind.as_str()).red(), err.message),
        }
    }
    println!(
        "\n{} verses: {} classified, {} failed",
        style(batch.summary.total).cyan(),
        style(batch.summary.successful).green(),
        if batch.summary.failed > 0 {
            style(batch.summary.failed).red()
        } else {
            style(batch.summary.failed).dim()
        }
    );
    Ok(())
}
