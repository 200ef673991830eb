//! Storage traits and error types
//!
//! This module defines the trait interface for the persisted post tables and
//! the run log, plus associated error types.

use crate::state::{BoardReport, ExtractionStatus, PostRecord};
use crate::storage::{RunRecord, RunStatus};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Table does not exist: {0}")]
    MissingTable(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An append-or-create table of post records, loosely keyed by `id`
///
/// Appends never update existing rows; a repeated identifier produces a
/// duplicate row that a later dedup pass can remove.
pub trait PostTable {
    /// Returns true if the table has been created
    fn table_exists(&self, table: &str) -> StorageResult<bool>;

    /// Reads every distinct value of one column, used to seed the ledger
    ///
    /// A missing table reads as an empty set.
    fn read_column(&self, table: &str, column: &str) -> StorageResult<HashSet<String>>;

    /// Appends rows atomically
    ///
    /// When `write_header_if_new` is set a missing table is created first;
    /// otherwise appending to a missing table fails with `MissingTable`.
    /// Either every row is written or none is.
    fn append_rows(
        &mut self,
        table: &str,
        rows: &[PostRecord],
        write_header_if_new: bool,
    ) -> StorageResult<()>;
}

/// Read-side statistics and maintenance over post tables
pub trait TableMaintenance {
    /// Counts all rows, duplicates included
    fn count_rows(&self, table: &str) -> StorageResult<u64>;

    /// Counts distinct identifiers
    fn count_distinct_ids(&self, table: &str) -> StorageResult<u64>;

    /// Counts rows per extraction status
    fn count_by_status(&self, table: &str) -> StorageResult<HashMap<ExtractionStatus, u64>>;

    /// Deletes every row whose identifier already appeared in an earlier row
    ///
    /// Returns the number of rows removed.
    fn remove_duplicates(&mut self, table: &str) -> StorageResult<u64>;

    /// Reads all titles, in insertion order
    fn read_titles(&self, table: &str) -> StorageResult<Vec<String>>;
}

/// Bookkeeping of harvest runs and their board outcomes
pub trait RunLog {
    /// Creates a new run and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Stores one board's report under a run
    fn record_board_report(&mut self, run_id: i64, report: &BoardReport) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets the board reports stored for a run, in board order
    fn get_board_reports(&self, run_id: i64) -> StorageResult<Vec<BoardReport>>;
}
