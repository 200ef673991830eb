//! Board targets and per-board run reports

use super::ExtractionStatus;
use chrono::{DateTime, Utc};
use std::fmt;

/// One board to harvest in a session; read-only while the session runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardTarget {
    pub board_id: String,
    pub output_table: String,
    /// Number of new posts to collect
    pub target_count: usize,
}

/// Why link discovery stopped scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStop {
    /// Enough new links were found
    TargetReached,
    /// Neither links nor page height grew for the stability threshold
    Stable,
    /// The hard iteration cap was hit
    IterationCap,
}

impl DiscoveryStop {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::Stable => "stable",
            Self::IterationCap => "iteration_cap",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "target_reached" => Some(Self::TargetReached),
            "stable" => Some(Self::Stable),
            "iteration_cap" => Some(Self::IterationCap),
            _ => None,
        }
    }
}

impl fmt::Display for DiscoveryStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Outcome of one board session
#[derive(Debug, Clone, PartialEq)]
pub struct BoardReport {
    pub board_id: String,
    pub output_table: String,

    /// New links produced by discovery
    pub links_discovered: usize,

    /// Why discovery stopped, if it ran
    pub discovery_stop: Option<DiscoveryStop>,

    pub complete: usize,
    pub partially_failed: usize,
    pub failed: usize,

    /// Links dropped by the pre-extraction ledger check
    pub skipped_duplicates: usize,

    /// Records written to the table
    pub persisted: usize,

    /// Size of each successful flush, in order
    pub flushes: Vec<usize>,

    /// Set when the board's feed could not be reached at all
    pub unreachable: Option<String>,

    /// Last persistence failure, if any flush failed
    pub persistence_error: Option<String>,
}

impl BoardReport {
    pub fn new(target: &BoardTarget) -> Self {
        Self {
            board_id: target.board_id.clone(),
            output_table: target.output_table.clone(),
            links_discovered: 0,
            discovery_stop: None,
            complete: 0,
            partially_failed: 0,
            failed: 0,
            skipped_duplicates: 0,
            persisted: 0,
            flushes: Vec::new(),
            unreachable: None,
            persistence_error: None,
        }
    }

    /// A report for a board whose session failed before any post was visited
    pub fn unreachable(target: &BoardTarget, reason: impl Into<String>) -> Self {
        let mut report = Self::new(target);
        report.unreachable = Some(reason.into());
        report
    }

    /// Counts one extracted record
    pub fn record(&mut self, status: ExtractionStatus) {
        match status {
            ExtractionStatus::Complete => self.complete += 1,
            ExtractionStatus::PartiallyFailed => self.partially_failed += 1,
            ExtractionStatus::Failed => self.failed += 1,
        }
    }

    pub fn count(&self, status: ExtractionStatus) -> usize {
        match status {
            ExtractionStatus::Complete => self.complete,
            ExtractionStatus::PartiallyFailed => self.partially_failed,
            ExtractionStatus::Failed => self.failed,
        }
    }

    pub fn extracted(&self) -> usize {
        self.complete + self.partially_failed + self.failed
    }

    pub fn is_hard_failure(&self) -> bool {
        self.unreachable.is_some()
    }
}

/// Outcome of a whole run across boards
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub boards: Vec<BoardReport>,
}

impl HarvestReport {
    pub fn total_persisted(&self) -> usize {
        self.boards.iter().map(|b| b.persisted).sum()
    }

    pub fn hard_failures(&self) -> usize {
        self.boards.iter().filter(|b| b.is_hard_failure()).count()
    }

    pub fn has_persistence_errors(&self) -> bool {
        self.boards.iter().any(|b| b.persistence_error.is_some())
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
