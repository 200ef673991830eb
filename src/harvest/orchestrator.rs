//! Board crawl orchestration
//!
//! Boards are harvested one after another on a single driver session:
//! seed the ledger from the board's table, open the feed, discover links,
//! extract each unclaimed post, and write records through the checkpointed
//! writer. A board that cannot be reached is reported and skipped; the run
//! continues with the next board.

use super::discovery::{DiscoverySettings, LinkDiscovery};
use super::extractor::ContentExtractor;
use super::ledger::Ledger;
use super::pacing;
use super::writer::CheckpointWriter;
use crate::config::{Config, HarvestSettings, SiteConfig};
use crate::driver::PageDriver;
use crate::state::{BoardReport, BoardTarget, ExtractionStatus, HarvestReport};
use crate::storage::PostTable;
use crate::url::PostLinkMatcher;
use crate::{HarvestError, Result};
use chrono::Utc;
use std::time::Duration;
use url::Url;

/// The outcome of one board session together with its final ledger
#[derive(Debug)]
pub struct BoardSession {
    pub report: BoardReport,
    pub ledger: Ledger,
}

/// Main harvest coordinator structure
pub struct Orchestrator<'a, D: PageDriver, S: PostTable> {
    driver: D,
    store: &'a mut S,
    site: SiteConfig,
    settings: HarvestSettings,
    matcher: PostLinkMatcher,
    extractor: ContentExtractor,
}

impl<'a, D: PageDriver, S: PostTable> Orchestrator<'a, D, S> {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `driver` - The page session; `run` shuts it down when done
    /// * `store` - Where board tables live
    pub fn new(config: &Config, driver: D, store: &'a mut S) -> Self {
        Self {
            driver,
            store,
            site: config.site.clone(),
            settings: config.harvest.clone(),
            matcher: PostLinkMatcher::from(&config.site),
            extractor: ContentExtractor::new(&config.extract, &config.harvest),
        }
    }

    /// Harvests every target in order, then shuts the driver down
    ///
    /// The driver is shut down on every path out of the loop; board failures
    /// are folded into their reports and never end the run early.
    pub async fn run(&mut self, targets: &[BoardTarget]) -> HarvestReport {
        let started_at = Utc::now();
        let mut boards = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            let session = self.harvest_board(target).await;
            boards.push(session.report);

            if index + 1 < targets.len() {
                pacing::pause(self.settings.board_pause_ms).await;
            }
        }

        if let Err(e) = self.driver.shutdown().await {
            tracing::warn!("Page driver shutdown failed: {}", e);
        }

        HarvestReport {
            started_at,
            finished_at: Utc::now(),
            boards,
        }
    }

    /// Harvests one board, catching board-level failures
    pub async fn harvest_board(&mut self, target: &BoardTarget) -> BoardSession {
        tracing::info!(
            "Starting board {} -> {} (target {})",
            target.board_id,
            target.output_table,
            target.target_count
        );

        let mut report = BoardReport::new(target);
        let mut ledger = Ledger::new();

        match self.try_harvest_board(target, &mut report, &mut ledger).await {
            Ok(()) => {}
            Err(HarvestError::Storage(e)) => {
                tracing::error!("Board {} storage failure: {}", target.board_id, e);
                report.persistence_error = Some(e.to_string());
            }
            Err(e) => {
                tracing::error!("Board {} failed: {}", target.board_id, e);
                report.unreachable = Some(e.to_string());
            }
        }

        tracing::info!(
            "Finished board {}: {} complete, {} partial, {} failed, {} persisted",
            target.board_id,
            report.count(ExtractionStatus::Complete),
            report.count(ExtractionStatus::PartiallyFailed),
            report.count(ExtractionStatus::Failed),
            report.persisted
        );

        BoardSession { report, ledger }
    }

    async fn try_harvest_board(
        &mut self,
        target: &BoardTarget,
        report: &mut BoardReport,
        ledger: &mut Ledger,
    ) -> Result<()> {
        let existing = self.store.read_column(&target.output_table, "id")?;
        ledger.seed_from(existing);
        tracing::debug!(
            "Seeded ledger for {} with {} identifiers",
            target.board_id,
            ledger.len()
        );

        let feed_url = self.site.feed_url(&target.board_id);
        let base = Url::parse(&feed_url).map_err(|e| HarvestError::Navigation {
            url: feed_url.clone(),
            reason: e.to_string(),
        })?;

        self.open_feed(&feed_url).await?;
        pacing::sleep_for(Duration::from_millis(self.settings.feed_settle_ms)).await;

        let discovery = LinkDiscovery::new(
            &self.matcher,
            DiscoverySettings::for_target(&self.settings, target.target_count),
        );
        let outcome = discovery.discover(&mut self.driver, ledger, &base).await;

        report.links_discovered = outcome.links.len();
        report.discovery_stop = Some(outcome.stop);
        tracing::info!(
            "Discovered {} new links on {} after {} scrolls ({})",
            outcome.links.len(),
            target.board_id,
            outcome.state.iterations,
            outcome.stop
        );

        let mut writer =
            CheckpointWriter::new(&mut *self.store, &target.output_table, self.settings.batch_size);

        for link in &outcome.links {
            if !ledger.add(&link.id) {
                report.skipped_duplicates += 1;
                continue;
            }

            let record = self.extractor.extract(&mut self.driver, link).await;
            report.record(record.status);

            if !record.status.has_content() {
                continue;
            }

            writer.append(record);
            if let Err(e) = writer.flush_if_full() {
                tracing::error!(
                    "Flush to {} failed, keeping {} records: {}",
                    target.output_table,
                    writer.pending(),
                    e
                );
                report.persistence_error = Some(e.to_string());
            }
        }

        if let Err(e) = writer.flush_remainder() {
            tracing::error!(
                "Final flush to {} failed, {} records not written: {}",
                target.output_table,
                writer.pending(),
                e
            );
            report.persistence_error = Some(e.to_string());
        }

        report.flushes = writer.flushes().to_vec();
        report.persisted = writer.persisted();

        Ok(())
    }

    /// Navigates to the feed, retrying with a fixed backoff
    async fn open_feed(&mut self, feed_url: &str) -> Result<()> {
        let attempts = self.settings.board_retry_attempts.max(1);
        let timeout = self.settings.navigation_timeout();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(timeout, self.driver.navigate(feed_url)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("timed out after {:?}", timeout),
            }

            tracing::warn!(
                "Feed {} attempt {}/{} failed: {}",
                feed_url,
                attempt,
                attempts,
                last_error
            );

            if attempt < attempts {
                pacing::sleep_for(Duration::from_millis(self.settings.board_retry_backoff_ms))
                    .await;
            }
        }

        Err(HarvestError::Navigation {
            url: feed_url.to_string(),
            reason: last_error,
        })
    }
}
