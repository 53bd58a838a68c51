//! Retention planner - Main entry point
//!
//! Reads a remote backup listing and prints the backups the pruning job may
//! delete. Nothing is deleted here.

use anyhow::{Context, Result};
use backup_retention::retention::chain::chain_issues;
use backup_retention::{plan_retention, plan_retention_checked, read_listing, utils, Config};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON backup listing produced by the remote storage
    #[arg(short, long, value_name = "FILE")]
    backups: PathBuf,

    /// Number of most recent backups to keep (overrides config)
    #[arg(short, long)]
    keep: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the full plan as JSON instead of one name per line
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        Config::default()
    };
    let config = config.with_keep_override(args.keep);

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    if !config.retention_enabled() {
        tracing::info!("Remote retention disabled (keep = 0), nothing to plan");
        return Ok(());
    }
    let keep = config.retention.keep_remote;

    let backups = read_listing(&args.backups)
        .with_context(|| format!("loading listing {}", args.backups.display()))?;

    tracing::info!(
        "Planning retention for {} backups (keep: {}, format: {})",
        backups.len(),
        keep,
        config.compression.format
    );

    let issues = chain_issues(&backups);
    for issue in &issues {
        tracing::warn!("Backup chain problem: {}", issue);
    }

    let plan = if config.retention.strict_chains {
        plan_retention_checked(&backups, keep)
            .with_context(|| format!("{} incremental chain problem(s), refusing to plan deletions", issues.len()))?
    } else {
        plan_retention(&backups, keep)
    };

    if args.json {
        let output = serde_json::json!({
            "keep": plan.kept.iter().map(|b| &b.backup_name).collect::<Vec<_>>(),
            "rescued": plan.rescued.iter().map(|b| &b.backup_name).collect::<Vec<_>>(),
            "in_progress": plan.in_progress.iter().map(|b| &b.backup_name).collect::<Vec<_>>(),
            "delete": plan.deletable,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for name in plan.deletable_names() {
            println!("{}", name);
        }
    }

    Ok(())
}
