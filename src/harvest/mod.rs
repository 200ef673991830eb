//! The crawl-state engine
//!
//! This module contains the pipeline that turns a board feed into persisted
//! post records:
//! - Link discovery with scroll-stability termination
//! - The per-board dedup ledger
//! - Field extraction through fallback strategy chains
//! - Checkpointed batch writes
//! - Board orchestration and run bookkeeping

mod discovery;
mod extractor;
mod ledger;
mod orchestrator;
pub mod pacing;
mod strategy;
mod writer;

pub use discovery::{DiscoveryOutcome, DiscoverySettings, LinkDiscovery, ScrollState};
pub use extractor::{flatten_comment, ContentExtractor};
pub use ledger::Ledger;
pub use orchestrator::{BoardSession, Orchestrator};
pub use strategy::{FallbackChain, Resolution, Strategy};
pub use writer::CheckpointWriter;

use crate::config::{Config, DriverKind};
use crate::driver::{PageDriver, StaticHtmlDriver};
use crate::output::{generate_markdown_summary, RunSummary};
use crate::state::{BoardTarget, HarvestReport};
use crate::storage::{RunLog, RunStatus, SqliteStorage};
use crate::Result;
use std::path::Path;

/// Runs a full harvest over `targets`
///
/// Opens the database and starts the configured driver. Only then is the run
/// recorded, so a driver that fails to start leaves no open run behind. Every
/// board is harvested, the per-board reports are stored, and the markdown
/// summary is written.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `targets` - Boards to harvest, in order
///
/// # Returns
///
/// * `Ok(HarvestReport)` - Per-board outcome; failed boards are inside it
/// * `Err(HarvestError)` - Storage or driver could not be initialised
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    targets: &[BoardTarget],
) -> Result<HarvestReport> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let (run_id, status, report) = match config.driver.kind {
        DriverKind::Static => {
            let driver = StaticHtmlDriver::new(&config.driver)?;
            harvest_logged(config, config_hash, driver, &mut storage, targets).await?
        }
        DriverKind::Chromium => {
            run_with_chromium(config, config_hash, &mut storage, targets).await?
        }
    };

    let summary = RunSummary {
        run_id,
        started_at: report.started_at.to_rfc3339(),
        finished_at: Some(report.finished_at.to_rfc3339()),
        duration_seconds: Some(report.duration_seconds().max(0) as u64),
        status: status.to_db_string().to_string(),
        config_hash: config_hash.to_string(),
        boards: report.boards.clone(),
    };
    let summary_path = Path::new(&config.output.summary_path);
    match generate_markdown_summary(&summary, summary_path) {
        Ok(()) => tracing::info!("Summary written to {}", summary_path.display()),
        Err(e) => tracing::warn!("Could not write summary: {}", e),
    }

    Ok(report)
}

/// Records a run around one orchestrated pass with a started driver
async fn harvest_logged<D: PageDriver>(
    config: &Config,
    config_hash: &str,
    driver: D,
    storage: &mut SqliteStorage,
    targets: &[BoardTarget],
) -> Result<(i64, RunStatus, HarvestReport)> {
    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Starting harvest run {} over {} boards", run_id, targets.len());

    let report = Orchestrator::new(config, driver, storage).run(targets).await;

    for board in &report.boards {
        storage.record_board_report(run_id, board)?;
    }

    let status = RunStatus::from_report(&report);
    storage.finish_run(run_id, status)?;
    tracing::info!(
        "Run {} finished as {} in {}s: {} records persisted, {} boards unreachable",
        run_id,
        status.to_db_string(),
        report.duration_seconds(),
        report.total_persisted(),
        report.hard_failures()
    );

    Ok((run_id, status, report))
}

#[cfg(feature = "chromium")]
async fn run_with_chromium(
    config: &Config,
    config_hash: &str,
    storage: &mut SqliteStorage,
    targets: &[BoardTarget],
) -> Result<(i64, RunStatus, HarvestReport)> {
    let driver = crate::driver::ChromiumDriver::launch(&config.driver).await?;
    harvest_logged(config, config_hash, driver, storage, targets).await
}

#[cfg(not(feature = "chromium"))]
async fn run_with_chromium(
    _config: &Config,
    _config_hash: &str,
    _storage: &mut SqliteStorage,
    _targets: &[BoardTarget],
) -> Result<(i64, RunStatus, HarvestReport)> {
    Err(crate::ConfigError::Validation(
        "driver kind \"chromium\" needs a build with the `chromium` feature".to_string(),
    )
    .into())
}
