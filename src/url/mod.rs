//! URL handling module for Board-Harvest
//!
//! This module decides which feed anchors are post links, normalizes them,
//! and derives the identifier used as the dedup key.

mod matcher;
mod normalize;

pub use matcher::{IdentifierMode, PostLink, PostLinkMatcher};
pub use normalize::normalize_post_link;

use crate::config::SiteConfig;

impl From<&SiteConfig> for PostLinkMatcher {
    fn from(site: &SiteConfig) -> Self {
        PostLinkMatcher::new(
            site.post_link_selector.clone(),
            site.post_link_pattern.clone(),
            site.identifier,
        )
    }
}
