//! Classify command - predict and optionally explain one verse

use std::sync::Arc;

use anyhow::Result;
use chandas::classifier::ConfidenceLevel;
use chandas::explain::{Direction, Explanation};
use chandas::{ChandasConfig, ClassificationOutcome, ClassifyRequest, ExplanationStatus, ModelContext, Pipeline};
use console::style;

pub fn run(
    ctx: Arc<ModelContext>,
    config: &ChandasConfig,
    verse: &str,
    top_k: Option<usize>,
    explain: bool,
    explain_class: Option<usize>,
    format: &str,
) -> Result<()> {
    let pipeline = Pipeline::new(ctx, config.pipeline_options());
    let top_k = top_k.unwrap_or(pipeline.options().top_k);
    let request = ClassifyRequest {
        explain_class,
        ..ClassifyRequest::new(verse, top_k, explain)
    };
    let outcome = pipeline.run(&request)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn confidence_style(level: ConfidenceLevel) -> console::StyledObject<&'static str> {
    match level {
        ConfidenceLevel::High => style(level.as_str()).green().bold(),
        ConfidenceLevel::Medium => style(level.as_str()).yellow(),
        ConfidenceLevel::Low => style(level.as_str()).red(),
    }
}

pub(super) fn print_outcome(outcome: &ClassificationOutcome) {
    let pada = outcome
        .pada_lengths
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" + ");
    println!(
        "  Pattern  {}  {}",
        style(&outcome.pattern).cyan(),
        style(format!("({} syllables: {pada})", outcome.syllable_count)).dim()
    );

    let prediction = &outcome.prediction;
    println!(
        "  Meter    {}  {:.1}%  {}",
        style(&prediction.best.label).bold(),
        prediction.best.probability * 100.0,
        confidence_style(prediction.confidence)
    );
    for alt in &prediction.alternatives {
        println!(
            "           {}  {}",
            alt.label,
            style(format!("{:.1}%", alt.probability * 100.0)).dim()
        );
    }

    match &outcome.explanation {
        ExplanationStatus::NotRequested => {}
        ExplanationStatus::Computed(explanation) => print_explanation(explanation),
        ExplanationStatus::Skipped { reason } => {
            println!("\n  {} {}", style("Explanation skipped:").dim(), reason);
        }
        ExplanationStatus::Unavailable { reason, .. } => {
            println!("\n  {} {}", style("Explanation unavailable:").yellow(), reason);
        }
    }

    for note in &outcome.notes {
        println!("\n  {} {}", style("Note:").yellow(), note);
    }
}

fn print_explanation(e: &Explanation) {
    println!(
        "\n{}",
        style(format!("Why {} (class {})", e.class_label, e.class_index)).bold()
    );
    println!("  base value {:.3}", e.expected_value);
    for a in &e.top_features {
        let contribution = format!("{:+.4}", a.contribution);
        let contribution = match a.direction {
            Direction::Positive => style(contribution).green(),
            Direction::Negative => style(contribution).red(),
        };
        println!("  {:<26} {:>9.3}  {}", a.feature, a.value, contribution);
    }

    if !e.decision_paths.is_empty() {
        println!("\n{}", style("Decision paths").bold());
        for path in &e.decision_paths {
            println!(
                "  tree {}  {}",
                path.tree,
                style(format!("leaf p = {:.3}", path.leaf_probability)).dim()
            );
            for step in &path.steps {
                println!("    {step}");
            }
        }
    }

    if !e.counterfactuals.is_empty() {
        println!("\n{}", style("What would change the prediction").bold());
        for cf in &e.counterfactuals {
            println!(
                "  {}: {} {:.3} -> {:.3}  {} -> {} ({:.1}%)",
                cf.description,
                cf.feature,
                cf.original_value,
                cf.new_value,
                cf.original_label,
                style(&cf.new_label).cyan(),
                cf.new_probability * 100.0
            );
        }
    }
}
