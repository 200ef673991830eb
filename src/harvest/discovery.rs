//! Link discovery over an infinitely scrolling feed
//!
//! The loop scrolls, waits, and collects post links until one of three things
//! happens: enough new links were found, the feed stopped growing for
//! `stability_threshold` consecutive iterations, or the iteration cap was hit.

use super::ledger::Ledger;
use super::pacing;
use crate::config::{HarvestSettings, PauseRange};
use crate::driver::{DriverResult, PageDriver};
use crate::state::DiscoveryStop;
use crate::url::{PostLink, PostLinkMatcher};
use std::collections::HashSet;
use url::Url;

/// Tuning for one discovery pass
#[derive(Debug, Clone, Copy)]
pub struct DiscoverySettings {
    pub target_count: usize,
    pub stability_threshold: u32,
    pub max_iterations: u32,
    pub warmup_iterations: u32,
    pub scroll_pause: PauseRange,
}

impl DiscoverySettings {
    pub fn for_target(settings: &HarvestSettings, target_count: usize) -> Self {
        Self {
            target_count,
            stability_threshold: settings.stability_threshold,
            max_iterations: settings.max_scroll_iterations,
            warmup_iterations: settings.warmup_iterations,
            scroll_pause: settings.scroll_pause_ms,
        }
    }
}

/// Scroll progress; lives only as long as one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub last_observed_height: Option<u64>,
    pub stable_iterations: u32,
    pub total_links_found: usize,
    pub iterations: u32,
}

impl ScrollState {
    /// Records the height seen after an iteration; returns true if it is
    /// known and equal to the previous known height
    fn observe_height(&mut self, height: Option<u64>) -> bool {
        let unchanged = matches!(
            (self.last_observed_height, height),
            (Some(previous), Some(current)) if previous == current
        );
        if height.is_some() {
            self.last_observed_height = height;
        }
        unchanged
    }
}

/// What a discovery pass produced
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// New post links in discovery order, at most `target_count`
    pub links: Vec<PostLink>,
    pub stop: DiscoveryStop,
    pub state: ScrollState,
}

/// Collects new post links from the feed currently loaded in a driver
pub struct LinkDiscovery<'a> {
    matcher: &'a PostLinkMatcher,
    settings: DiscoverySettings,
}

impl<'a> LinkDiscovery<'a> {
    pub fn new(matcher: &'a PostLinkMatcher, settings: DiscoverySettings) -> Self {
        Self { matcher, settings }
    }

    /// Runs the scroll loop
    ///
    /// Links whose identifier is already in `ledger` are not counted. Query and
    /// scroll errors are logged and the iteration counts as finding nothing.
    ///
    /// # Arguments
    ///
    /// * `driver` - Driver positioned on the board feed
    /// * `ledger` - Identifiers persisted by earlier runs
    /// * `feed_url` - Base for resolving relative hrefs when the driver cannot
    ///   report its own URL
    pub async fn discover<D: PageDriver>(
        &self,
        driver: &mut D,
        ledger: &Ledger,
        feed_url: &Url,
    ) -> DiscoveryOutcome {
        let mut state = ScrollState {
            last_observed_height: driver.page_height().await.ok().flatten(),
            ..ScrollState::default()
        };
        let mut links: Vec<PostLink> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if self.settings.target_count == 0 {
            return DiscoveryOutcome {
                links,
                stop: DiscoveryStop::TargetReached,
                state,
            };
        }

        let base = match driver.current_url().await {
            Ok(current) => Url::parse(&current).unwrap_or_else(|_| feed_url.clone()),
            Err(_) => feed_url.clone(),
        };

        let mut stop = DiscoveryStop::IterationCap;

        while state.iterations < self.settings.max_iterations {
            state.iterations += 1;

            if let Err(e) = driver.scroll_to_bottom().await {
                tracing::warn!("Scroll failed on iteration {}: {}", state.iterations, e);
            }
            pacing::pause(self.settings.scroll_pause).await;

            let (anchors, new_links) = match self.collect(driver, &base).await {
                Ok((anchors, candidates)) => {
                    let mut added = 0;
                    for link in candidates {
                        if ledger.contains(&link.id) || !seen.insert(link.id.clone()) {
                            continue;
                        }
                        links.push(link);
                        added += 1;
                    }
                    (anchors, added)
                }
                Err(e) => {
                    tracing::warn!(
                        "Link query failed on iteration {}: {}",
                        state.iterations,
                        e
                    );
                    (0, 0)
                }
            };

            state.total_links_found = links.len();
            let height = driver.page_height().await.ok().flatten();
            let height_unchanged = state.observe_height(height);

            if links.len() >= self.settings.target_count {
                stop = DiscoveryStop::TargetReached;
                break;
            }

            let warming_up = state.iterations <= self.settings.warmup_iterations
                && anchors == 0
                && seen.is_empty();
            if warming_up {
                tracing::debug!(
                    "Feed not rendered yet on iteration {}, waiting",
                    state.iterations
                );
                continue;
            }

            if new_links == 0 || height_unchanged {
                state.stable_iterations += 1;
            } else {
                state.stable_iterations = 0;
            }

            tracing::debug!(
                "Iteration {}: {} new, {} total, height {:?}, stable {}",
                state.iterations,
                new_links,
                links.len(),
                height,
                state.stable_iterations
            );

            if state.stable_iterations >= self.settings.stability_threshold {
                stop = DiscoveryStop::Stable;
                break;
            }
        }

        links.truncate(self.settings.target_count);

        DiscoveryOutcome { links, stop, state }
    }

    /// Queries the post anchors; returns the raw anchor count and the ones
    /// that are post links
    async fn collect<D: PageDriver>(
        &self,
        driver: &mut D,
        base: &Url,
    ) -> DriverResult<(usize, Vec<PostLink>)> {
        let anchors = driver.query_all(self.matcher.selector()).await?;
        let mut candidates = Vec::with_capacity(anchors.len());

        for anchor in &anchors {
            let href = match driver.element_attribute(anchor, "href").await {
                Ok(Some(href)) => href,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!("Skipping unreadable anchor: {}", e);
                    continue;
                }
            };
            if let Ok(link) = self.matcher.match_href(&href, base) {
                candidates.push(link);
            }
        }

        Ok((anchors.len(), candidates))
    }
}
