//! The harvested post record

use super::ExtractionStatus;
use crate::url::PostLink;
use chrono::{DateTime, Utc};

/// Title stored when no title strategy produced text
pub const UNRESOLVED_TITLE: &str = "unresolved title";

/// Separator between comments in the flattened comment field
///
/// Joining is lossy: line breaks inside a comment are collapsed to spaces and
/// `||` runs inside a comment are squeezed, so splitting on this delimiter
/// always yields the original comment count.
pub const COMMENT_DELIMITER: &str = " || ";

/// One harvested post, immutable once written
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    /// Dedup key (normalized link or post id)
    pub id: String,
    pub link: String,
    /// Post title or `UNRESOLVED_TITLE`
    pub title: String,
    /// Post body, empty when unresolved
    pub body: String,
    /// Top comments, already bounded and flattened
    pub comments: Vec<String>,
    pub status: ExtractionStatus,
    pub crawled_at: DateTime<Utc>,
}

impl PostRecord {
    /// A record for a post whose page could not be reached
    pub fn failed(link: &PostLink) -> Self {
        Self {
            id: link.id.clone(),
            link: link.url.to_string(),
            title: UNRESOLVED_TITLE.to_string(),
            body: String::new(),
            comments: Vec::new(),
            status: ExtractionStatus::Failed,
            crawled_at: Utc::now(),
        }
    }

    /// The comment list as a single delimited field
    pub fn comments_field(&self) -> String {
        self.comments.join(COMMENT_DELIMITER)
    }

    pub fn has_resolved_title(&self) -> bool {
        self.title != UNRESOLVED_TITLE
    }
}

/// Splits a stored comment field back into its segments
pub fn split_comments_field(field: &str) -> Vec<&str> {
    if field.is_empty() {
        Vec::new()
    } else {
        field.split(COMMENT_DELIMITER).collect()
    }
}
