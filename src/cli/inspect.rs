//! Inspect command - load and summarise the model artifacts

use anyhow::Result;
use chandas::classifier::{Estimator, NUM_FEATURES};
use chandas::ChandasConfig;
use console::style;

pub fn run(config: &ChandasConfig) -> Result<()> {
    let paths = config.model_paths();
    println!("\nChandas model\n");
    println!("  Directory: {}", style(config.model.dir.display()).cyan());

    let ctx = super::load_model(config)?;
    let voting = ctx.ensemble().inner();
    let forest = voting.forest();
    let [w_forest, w_boosted] = voting.weights();

    println!("  {} {}", style("[OK]").green(), paths.labels.display());
    println!("  {} {}", style("[OK]").green(), paths.scaler.display());
    println!("  {} {}", style("[OK]").green(), paths.ensemble.display());
    println!();
    println!("  Features: {}", style(NUM_FEATURES).cyan());
    println!(
        "  Forest:   {} trees, {} nodes",
        style(forest.trees().len()).cyan(),
        forest.trees().iter().map(|t| t.len()).sum::<usize>()
    );
    println!(
        "  Boosted:  {} one-vs-rest models",
        style(voting.boosted().n_classes()).cyan()
    );
    println!("  Voting:   forest {:.2} / boosted {:.2}", w_forest, w_boosted);
    println!("  Classes:  {}", style(ctx.n_classes()).cyan());
    for (i, label) in ctx.labels().iter().enumerate() {
        println!("    {:>2}  {}", i, label);
    }
    Ok(())
}
