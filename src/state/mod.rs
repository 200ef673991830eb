//! Harvest state: post records, their extraction status, and board reports

mod record;
mod report;
mod status;

pub use record::{split_comments_field, PostRecord, COMMENT_DELIMITER, UNRESOLVED_TITLE};
pub use report::{BoardReport, BoardTarget, DiscoveryStop, HarvestReport};
pub use status::ExtractionStatus;
