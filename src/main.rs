//! Board-Harvest main entry point
//!
//! This is the command-line interface for the Board-Harvest forum harvester.

use anyhow::{bail, Context};
use board_harvest::config::{load_config_with_hash, Config};
use board_harvest::output::{
    collect_hot_keywords, generate_markdown_summary, generate_summary, load_statistics,
    print_statistics, write_keywords_script,
};
use board_harvest::run_harvest;
use board_harvest::state::{BoardTarget, HarvestReport};
use board_harvest::storage::{open_storage, TableMaintenance};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Board-Harvest: an incremental discussion-board harvester
///
/// Board-Harvest scrolls each board's feed, extracts title, body and top
/// comments from every post it has not stored yet, and appends them to one
/// table per board in checkpointed batches.
#[derive(Parser, Debug)]
#[command(name = "board-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental discussion-board harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only process these board ids (repeatable)
    #[arg(long = "board", value_name = "ID")]
    boards: Vec<String>,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["stats", "dedupe", "export_keywords", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "dedupe", "export_keywords", "export_summary"])]
    stats: bool,

    /// Remove duplicate rows per post identifier and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_keywords", "export_summary"])]
    dedupe: bool,

    /// Write the hot-keyword script from stored titles and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "dedupe", "export_summary"])]
    export_keywords: bool,

    /// Regenerate the markdown summary of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "dedupe", "export_keywords"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let targets = select_targets(&config, &cli.boards)?;

    if cli.dry_run {
        handle_dry_run(&config, &targets);
    } else if cli.stats {
        handle_stats(&config, &targets)?;
    } else if cli.dedupe {
        handle_dedupe(&config, &targets)?;
    } else if cli.export_keywords {
        handle_export_keywords(&config, &targets)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_harvest(&config, &config_hash, &targets).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("board_harvest=info,warn"),
            1 => EnvFilter::new("board_harvest=debug,info"),
            2 => EnvFilter::new("board_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves the boards to work on, honouring `--board` filters
fn select_targets(config: &Config, filter: &[String]) -> anyhow::Result<Vec<BoardTarget>> {
    let all = config.board_targets();
    if filter.is_empty() {
        return Ok(all);
    }

    for id in filter {
        if !all.iter().any(|t| &t.board_id == id) {
            bail!("Board '{}' is not configured", id);
        }
    }

    Ok(all
        .into_iter()
        .filter(|t| filter.contains(&t.board_id))
        .collect())
}

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config, targets: &[BoardTarget]) {
    println!("=== Board-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Feed path: {}", config.site.feed_path);
    println!("  Post link selector: {}", config.site.post_link_selector);
    println!("  Identifier: {:?}", config.site.identifier);

    println!("\nHarvest Settings:");
    println!("  Batch size: {}", config.harvest.batch_size);
    println!("  Max comments: {}", config.harvest.max_comments);
    println!(
        "  Stability threshold: {} (cap {} scrolls)",
        config.harvest.stability_threshold, config.harvest.max_scroll_iterations
    );
    println!("  Driver: {:?}", config.driver.kind);

    println!("\nExtraction Chains:");
    let chain = |strategies: &[board_harvest::harvest::Strategy]| {
        strategies
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    };
    println!("  Title: {}", chain(&config.extract.title));
    println!("  Body: {}", chain(&config.extract.body));
    println!("  Comments: {}", chain(&config.extract.comments));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nBoards ({}):", targets.len());
    for target in targets {
        println!(
            "  - {} -> {} (target {})",
            target.board_id, target.output_table, target.target_count
        );
        println!("    * {}", config.site.feed_url(&target.board_id));
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, targets: &[BoardTarget]) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage, targets)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --dedupe mode: keeps the first row per post identifier
fn handle_dedupe(config: &Config, targets: &[BoardTarget]) -> anyhow::Result<()> {
    println!("=== Removing Duplicate Rows ===\n");

    let mut storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let mut total = 0;
    for target in targets {
        let removed = storage
            .remove_duplicates(&target.output_table)
            .with_context(|| format!("Failed to dedupe table {}", target.output_table))?;
        tracing::info!("Removed {} duplicate rows from {}", removed, target.output_table);
        println!("  {}: {} rows removed", target.output_table, removed);
        total += removed;
    }

    println!("\n✓ Removed {} duplicate rows", total);
    Ok(())
}

/// Handles the --export-keywords mode: writes the hot-keyword script
fn handle_export_keywords(config: &Config, targets: &[BoardTarget]) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let keywords = collect_hot_keywords(&storage, targets, &config.keywords)?;
    let path = Path::new(&config.output.keywords_path);
    write_keywords_script(&keywords, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Exported {} keywords to: {}", keywords.len(), path.display());
    Ok(())
}

/// Handles the --export-summary mode: rebuilds the summary from the run log
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Run Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    tracing::info!("Loading latest run from database...");
    let summary = generate_summary(&storage)?;

    let path = Path::new(&config.output.summary_path);
    generate_markdown_summary(&summary, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Summary of run #{} exported to: {}", summary.run_id, path.display());
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
    targets: &[BoardTarget],
) -> anyhow::Result<()> {
    if targets.is_empty() {
        tracing::warn!("No boards configured, nothing to harvest");
        return Ok(());
    }

    let report = run_harvest(config, config_hash, targets)
        .await
        .context("Harvest could not start")?;

    print_report(&report);
    Ok(())
}

/// Prints the per-board status table
fn print_report(report: &HarvestReport) {
    println!(
        "{:<16} {:>9} {:>9} {:>8} {:>10}  {}",
        "board", "complete", "partial", "failed", "persisted", "status"
    );
    for board in &report.boards {
        let status = match (&board.unreachable, &board.persistence_error) {
            (Some(reason), _) => format!("unreachable: {}", reason),
            (None, Some(error)) => format!("flush failed: {}", error),
            (None, None) => "ok".to_string(),
        };
        println!(
            "{:<16} {:>9} {:>9} {:>8} {:>10}  {}",
            board.board_id,
            board.complete,
            board.partially_failed,
            board.failed,
            board.persisted,
            status
        );
    }
}
