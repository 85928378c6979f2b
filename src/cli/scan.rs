//! Pattern and features commands - prosody only, no model needed

use anyhow::Result;
use chandas::classifier::extract;
use chandas::prosody::scan;
use chandas::ChandasConfig;
use console::style;

pub fn pattern(config: &ChandasConfig, verse: &str) -> Result<()> {
    let scansion = scan(verse, &config.pipeline_options().prosody)?;
    let pattern = scansion.pattern();
    println!("{}", style(pattern).cyan().bold());
    println!(
        "  {} syllables, {} guru, {} laghu",
        style(pattern.len()).cyan(),
        pattern.guru_count(),
        pattern.laghu_count()
    );
    let padas = scansion.pada_lengths();
    println!(
        "  padas: {}",
        padas
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    );
    Ok(())
}

pub fn features(config: &ChandasConfig, verse: &str, format: &str) -> Result<()> {
    let scansion = scan(verse, &config.pipeline_options().prosody)?;
    let features = extract(scansion.pattern());

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&features)?);
        return Ok(());
    }

    println!("{}", style(scansion.pattern()).cyan());
    for (name, value) in features.iter() {
        println!("  {:<26} {:>10.4}", name, value);
    }
    Ok(())
}
