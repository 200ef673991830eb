//! Statistics over the board tables
//!
//! This module loads per-table counts from storage for the `--stats` mode.

use crate::state::{BoardTarget, ExtractionStatus};
use crate::storage::{RunLog, RunRecord, StorageResult, TableMaintenance};
use std::collections::HashMap;

/// Counts for one board table
#[derive(Debug, Clone)]
pub struct TableStatistics {
    pub board_id: String,
    pub table: String,

    /// All rows, duplicates included
    pub rows: u64,

    /// Distinct post identifiers
    pub distinct_ids: u64,

    /// Rows by extraction status
    pub by_status: HashMap<ExtractionStatus, u64>,
}

impl TableStatistics {
    /// Rows a dedup pass would remove
    pub fn duplicate_rows(&self) -> u64 {
        self.rows.saturating_sub(self.distinct_ids)
    }
}

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    pub tables: Vec<TableStatistics>,
    pub latest_run: Option<RunRecord>,
}

impl HarvestStatistics {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn total_distinct(&self) -> u64 {
        self.tables.iter().map(|t| t.distinct_ids).sum()
    }
}

/// Loads statistics for the given boards
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `targets` - Boards whose tables should be counted
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics<S>(storage: &S, targets: &[BoardTarget]) -> StorageResult<HarvestStatistics>
where
    S: TableMaintenance + RunLog,
{
    let mut tables = Vec::with_capacity(targets.len());

    for target in targets {
        tables.push(TableStatistics {
            board_id: target.board_id.clone(),
            table: target.output_table.clone(),
            rows: storage.count_rows(&target.output_table)?,
            distinct_ids: storage.count_distinct_ids(&target.output_table)?,
            by_status: storage.count_by_status(&target.output_table)?,
        });
    }

    Ok(HarvestStatistics {
        tables,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Boards: {}", stats.tables.len());
    println!("  Total rows: {}", stats.total_rows());
    println!("  Distinct posts: {}", stats.total_distinct());
    println!();

    for table in &stats.tables {
        println!("Board {} (table {}):", table.board_id, table.table);
        println!("  Rows: {}", table.rows);
        println!("  Distinct posts: {}", table.distinct_ids);
        println!("  Duplicate rows: {}", table.duplicate_rows());
        for status in ExtractionStatus::ALL {
            let count = table.by_status.get(&status).copied().unwrap_or(0);
            let percentage = if table.rows > 0 {
                (count as f64 / table.rows as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest run: #{} ({})", run.id, run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
        }
        None => println!("No harvest runs recorded yet"),
    }
}
