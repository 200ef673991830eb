use super::normalize::normalize_post_link;
use crate::{UrlError, UrlResult};
use serde::Deserialize;
use url::Url;

/// Granularity of the dedup key derived from a post link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierMode {
    /// The normalized link itself
    #[default]
    Link,
    /// The path segment that follows the post-link pattern (e.g. `/p/123` -> `123`)
    PostId,
}

/// A discovered post: its dedup identifier and the normalized link to visit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostLink {
    pub id: String,
    pub url: Url,
}

/// Recognizes post links among the anchors of a feed
#[derive(Debug, Clone)]
pub struct PostLinkMatcher {
    selector: String,
    pattern: String,
    mode: IdentifierMode,
}

impl PostLinkMatcher {
    pub fn new(
        selector: impl Into<String>,
        pattern: impl Into<String>,
        mode: IdentifierMode,
    ) -> Self {
        Self {
            selector: selector.into(),
            pattern: pattern.into(),
            mode,
        }
    }

    /// CSS selector used to query candidate anchors
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Turns an anchor href into a `PostLink`
    ///
    /// The href must contain the post pattern after normalization; anything
    /// else (board navigation, user profiles, ads) is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use board_harvest::url::{IdentifierMode, PostLinkMatcher};
    /// use url::Url;
    ///
    /// let base = Url::parse("https://forum.example.com/f/food").unwrap();
    /// let matcher = PostLinkMatcher::new("a", "/p/", IdentifierMode::PostId);
    ///
    /// let link = matcher.match_href("/f/food/p/2345?ref=feed", &base).unwrap();
    /// assert_eq!(link.id, "2345");
    /// assert!(matcher.match_href("/f/food/rules", &base).is_err());
    /// ```
    pub fn match_href(&self, href: &str, base: &Url) -> UrlResult<PostLink> {
        let url = normalize_post_link(href, base)?;

        let id = match self.mode {
            IdentifierMode::Link => {
                if !url.as_str().contains(&self.pattern) {
                    return Err(UrlError::NotAPost(url.to_string()));
                }
                url.to_string()
            }
            IdentifierMode::PostId => post_id_after(url.path(), &self.pattern)
                .ok_or_else(|| UrlError::NotAPost(url.to_string()))?,
        };

        Ok(PostLink { id, url })
    }
}

/// Extracts the path segment that immediately follows `pattern`
fn post_id_after(path: &str, pattern: &str) -> Option<String> {
    let start = path.find(pattern)? + pattern.len();
    let segment = path[start..].split('/').next()?;

    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}
