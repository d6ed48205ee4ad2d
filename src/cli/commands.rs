//! 子命令实现

use std::path::{Path, PathBuf};
use std::time::Instant;

use adrules::{GlobalConfig, Pipeline, SourceRegistry};
use adrules_engine::{DeclaredType, LineOutcome, RuleParser, SourceId};
use anyhow::{Context, Result};
use tracing::info;

pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut config = GlobalConfig::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(dir) = output {
        config.output.dir = dir;
    }

    let pipeline = Pipeline::with_http(config).context("Failed to initialize HTTP client")?;
    let report = pipeline.run().await.context("Run failed")?;
    info!(
        "Run {} complete: {} block / {} allow, {} of {} sources failed",
        report.stats.version,
        report.stats.final_block_count,
        report.stats.final_allow_count,
        report.stats.sources_failed,
        report.stats.sources_total
    );
    Ok(())
}

pub fn validate(config_path: &Path) -> Result<()> {
    let config = GlobalConfig::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.validate().context("Invalid configuration")?;
    let registry = SourceRegistry::from_config(&config).context("Invalid source list")?;

    println!("Configuration OK: {} sources", registry.len());
    for source in registry.iter() {
        println!("  {:>4}  {}", source.id, source);
    }
    Ok(())
}

pub fn parse(declared_type: DeclaredType, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let parser = RuleParser::for_type(declared_type);
    let label = file.display().to_string();

    let start = Instant::now();
    let batch = parser.parse_content(&label, SourceId(0), &content);
    for rule in &batch.rules {
        println!("{}\t{}", rule.kind, rule.pattern);
    }

    let stats = &batch.stats;
    eprintln!(
        "lines {} | skipped {} | accepted {} | invalid {} | unsupported {} ({:.2?})",
        stats.total_lines,
        stats.skipped_lines,
        stats.accepted,
        stats.invalid,
        stats.unsupported,
        start.elapsed()
    );
    if stats.invalid > 0 {
        for line in content.lines() {
            if let LineOutcome::Invalid(e) = parser.parse_line(line) {
                eprintln!("invalid: {} ({})", line.trim(), e);
            }
        }
    }
    Ok(())
}
