//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a harvest run:
//! run metadata, a per-board status table, and any board or flush failures.

use super::OutputResult;
use crate::state::BoardReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Everything the run summary shows
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,
    pub boards: Vec<BoardReport>,
}

impl RunSummary {
    pub fn total_persisted(&self) -> usize {
        self.boards.iter().map(|b| b.persisted).sum()
    }

    pub fn total_extracted(&self) -> usize {
        self.boards.iter().map(BoardReport::extracted).sum()
    }
}

/// Generates a markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Board-Harvest Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Totals\n\n");
    md.push_str(&format!("- **Boards**: {}\n", summary.boards.len()));
    md.push_str(&format!(
        "- **Posts Extracted**: {}\n",
        summary.total_extracted()
    ));
    md.push_str(&format!(
        "- **Records Persisted**: {}\n\n",
        summary.total_persisted()
    ));

    md.push_str("## Boards\n\n");
    md.push_str(
        "| Board | Table | Discovered | Complete | Partial | Failed | Skipped | Persisted | Flushes | Stop |\n",
    );
    md.push_str(
        "|-------|-------|------------|----------|---------|--------|---------|-----------|---------|------|\n",
    );
    for board in &summary.boards {
        let stop = match (&board.unreachable, board.discovery_stop) {
            (Some(_), _) => "unreachable".to_string(),
            (None, Some(stop)) => stop.to_string(),
            (None, None) => "-".to_string(),
        };
        let flushes = if board.flushes.is_empty() {
            "-".to_string()
        } else {
            board
                .flushes
                .iter()
                .map(|size| size.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            board.board_id,
            board.output_table,
            board.links_discovered,
            board.complete,
            board.partially_failed,
            board.failed,
            board.skipped_duplicates,
            board.persisted,
            flushes,
            stop
        ));
    }
    md.push('\n');

    let problems: Vec<&BoardReport> = summary
        .boards
        .iter()
        .filter(|b| b.unreachable.is_some() || b.persistence_error.is_some())
        .collect();
    if !problems.is_empty() {
        md.push_str("## Problems\n\n");
        for board in problems {
            if let Some(reason) = &board.unreachable {
                md.push_str(&format!("- **{}** unreachable: {}\n", board.board_id, reason));
            }
            if let Some(error) = &board.persistence_error {
                md.push_str(&format!(
                    "- **{}** persistence error: {}\n",
                    board.board_id, error
                ));
            }
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by Board-Harvest*\n");

    md
}
