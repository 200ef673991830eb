//! Storage module for persisting harvested posts
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - One append-only post table per board
//! - Run tracking and per-board reports

mod schema;
mod sqlite;
mod traits;

pub use schema::RESERVED_TABLES;
pub use sqlite::SqliteStorage;
pub use traits::{PostTable, RunLog, StorageError, StorageResult, TableMaintenance};

use crate::state::HarvestReport;
use std::path::Path;

/// Longest table name accepted for a board
pub const MAX_TABLE_NAME_LEN: usize = 64;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Checks that a board's output table name is usable
///
/// Names are quoted when used, so any printable text is allowed except the
/// names SQLite and the bookkeeping schema reserve.
pub fn validate_table_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidTableName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.chars().count() > MAX_TABLE_NAME_LEN {
        return Err(invalid("too long"));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(invalid("contains control characters"));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(invalid("the sqlite_ prefix is reserved"));
    }
    if RESERVED_TABLES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(invalid("reserved for run bookkeeping"));
    }

    Ok(())
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Some boards were unreachable or lost a flush
    Partial,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Final status for a finished run
    pub fn from_report(report: &HarvestReport) -> Self {
        if !report.boards.is_empty() && report.hard_failures() == report.boards.len() {
            Self::Failed
        } else if report.hard_failures() > 0 || report.has_persistence_errors() {
            Self::Partial
        } else {
            Self::Completed
        }
    }
}
