//! Output module for run summaries, statistics and keyword export
//!
//! This module handles:
//! - Generating markdown summaries of harvest runs
//! - Printing per-table statistics
//! - Exporting hot keywords from persisted titles

pub mod keywords;
mod markdown;
pub mod stats;

pub use keywords::{compute_hot_keywords, write_keywords_script, HotKeyword};
pub use markdown::{format_markdown_summary, generate_markdown_summary, RunSummary};
pub use stats::{load_statistics, print_statistics, HarvestStatistics, TableStatistics};

use crate::config::KeywordConfig;
use crate::state::BoardTarget;
use crate::storage::{RunLog, StorageError, TableMaintenance};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No harvest runs found in database")]
    NoRuns,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Builds the summary of the most recent run
///
/// # Arguments
///
/// * `storage` - The storage backend holding the run log
///
/// # Returns
///
/// * `Ok(RunSummary)` - Summary of the latest run
/// * `Err(OutputError)` - No run recorded, or the query failed
pub fn generate_summary<S: RunLog>(storage: &S) -> OutputResult<RunSummary> {
    let run = storage.get_latest_run()?.ok_or(OutputError::NoRuns)?;

    let duration_seconds = match (
        run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        run.finished_at
            .as_deref()
            .map(str::parse::<chrono::DateTime<chrono::Utc>>),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    let boards = storage.get_board_reports(run.id)?;

    Ok(RunSummary {
        run_id: run.id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_seconds,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        boards,
    })
}

/// Computes hot keywords over the titles of the given boards
pub fn collect_hot_keywords<S: TableMaintenance>(
    storage: &S,
    targets: &[BoardTarget],
    config: &KeywordConfig,
) -> OutputResult<Vec<HotKeyword>> {
    let mut titles = Vec::new();
    for target in targets {
        titles.extend(storage.read_titles(&target.output_table)?);
    }

    Ok(compute_hot_keywords(
        titles.iter().map(String::as_str),
        &config.stopwords,
        config.top,
    ))
}
