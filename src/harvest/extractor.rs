//! Per-post content extraction
//!
//! Title, body and comments are resolved independently, so a template change
//! that breaks one field still leaves the others intact. Extraction never
//! fails: an unreachable post becomes a `Failed` record and an exhausted chain
//! becomes a sentinel value.

use super::pacing;
use super::strategy::{FallbackChain, Resolution};
use crate::config::{ExtractConfig, HarvestSettings, PauseRange};
use crate::driver::PageDriver;
use crate::state::{ExtractionStatus, PostRecord, UNRESOLVED_TITLE};
use crate::url::PostLink;
use chrono::Utc;
use std::time::Duration;

/// Flattens one comment into a single delimiter-safe line
///
/// Line breaks collapse to single spaces and any `||` run is squeezed to `|`
/// so the joined field always splits back into the same comment count.
pub fn flatten_comment(comment: &str) -> String {
    let mut flat = comment
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    while flat.contains("||") {
        flat = flat.replace("||", "|");
    }

    flat
}

/// Visits post pages and turns them into records
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    title: FallbackChain,
    body: FallbackChain,
    comments: FallbackChain,
    max_comments: usize,
    navigation_timeout: Duration,
    post_pause: PauseRange,
}

impl ContentExtractor {
    pub fn new(extract: &ExtractConfig, settings: &HarvestSettings) -> Self {
        let element_timeout = settings.element_timeout();
        Self {
            title: FallbackChain::new("title", extract.title.clone(), element_timeout),
            body: FallbackChain::new("body", extract.body.clone(), element_timeout),
            comments: FallbackChain::new("comments", extract.comments.clone(), element_timeout),
            max_comments: settings.max_comments,
            navigation_timeout: settings.navigation_timeout(),
            post_pause: settings.post_pause_ms,
        }
    }

    /// Navigates to a post and extracts its record
    pub async fn extract<D: PageDriver>(&self, driver: &mut D, link: &PostLink) -> PostRecord {
        let navigation =
            tokio::time::timeout(self.navigation_timeout, driver.navigate(link.url.as_str())).await;

        match navigation {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Post {} unreachable: {}", link.url, e);
                return PostRecord::failed(link);
            }
            Err(_) => {
                tracing::warn!(
                    "Post {} timed out after {:?}",
                    link.url,
                    self.navigation_timeout
                );
                return PostRecord::failed(link);
            }
        }

        pacing::pause(self.post_pause).await;

        let title = self.title.resolve_first(driver).await;
        let body = self.body.resolve_first(driver).await;
        let comments = self
            .comments
            .resolve_all(driver, self.max_comments)
            .await
            .map(|raw| {
                raw.iter()
                    .map(|comment| flatten_comment(comment))
                    .filter(|comment| !comment.is_empty())
                    .take(self.max_comments)
                    .collect::<Vec<_>>()
            });

        let status = if title.is_primary() && body.is_primary() && comments.is_primary() {
            ExtractionStatus::Complete
        } else {
            ExtractionStatus::PartiallyFailed
        };

        tracing::debug!(
            "Extracted {} ({}): title {}, body {}, comments {}",
            link.id,
            status,
            describe(&title),
            describe(&body),
            describe(&comments)
        );

        PostRecord {
            id: link.id.clone(),
            link: link.url.to_string(),
            title: title
                .into_value()
                .unwrap_or_else(|| UNRESOLVED_TITLE.to_string()),
            body: body.into_value().unwrap_or_default(),
            comments: comments.into_value().unwrap_or_default(),
            status,
            crawled_at: Utc::now(),
        }
    }
}

fn describe<T>(resolution: &Resolution<T>) -> &'static str {
    match resolution {
        Resolution::Primary(_) => "primary",
        Resolution::Fallback(_) => "fallback",
        Resolution::Unresolved => "unresolved",
    }
}
