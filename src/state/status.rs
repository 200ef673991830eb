/// Extraction status definitions for harvested posts
///
/// A post record carries exactly one of these, decided once by the content
/// extractor and never changed after the record is persisted.
use std::fmt;

/// How completely a post's fields were resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStatus {
    /// Title, body and comments all resolved through their primary strategy
    Complete,

    /// At least one field needed a fallback strategy or ended as a sentinel
    PartiallyFailed,

    /// The post page itself could not be reached; no field was attempted
    Failed,
}

impl ExtractionStatus {
    /// All statuses, in report order
    pub const ALL: [ExtractionStatus; 3] = [Self::Complete, Self::PartiallyFailed, Self::Failed];

    /// Returns true if the record carries usable content
    pub fn has_content(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::PartiallyFailed => "partially_failed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "complete" => Some(Self::Complete),
            "partially_failed" => Some(Self::PartiallyFailed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Complete => "Complete",
            Self::PartiallyFailed => "PartiallyFailed",
            Self::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
