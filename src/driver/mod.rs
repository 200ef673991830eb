//! Page driver capability
//!
//! The harvest engine never talks to a browser or HTTP client directly. It
//! drives one `PageDriver` session per run: navigate, query elements, read
//! their text or attributes, scroll, and inspect page height.
//!
//! Two adapters are provided:
//! - `StaticHtmlDriver` fetches pages over HTTP and treats each `rel="next"`
//!   page as the content revealed by one scroll
//! - `ChromiumDriver` drives headless Chromium (behind the `chromium` feature)

mod http;

#[cfg(feature = "chromium")]
mod chromium;

#[cfg(test)]
pub(crate) mod scripted;

pub use http::{build_http_client, StaticElement, StaticHtmlDriver};

#[cfg(feature = "chromium")]
pub use chromium::ChromiumDriver;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element query failed: {0}")]
    Query(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// One page session that the harvest engine drives sequentially
///
/// Every method takes `&mut self`: a session is never shared between
/// concurrent operations.
#[async_trait]
pub trait PageDriver: Send {
    /// Handle to an element returned by `query_all`
    type Element: Send + Sync;

    /// Loads `url`, replacing the current page
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Returns every element matching a CSS selector, in document order
    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<Self::Element>>;

    /// Rendered text of an element
    async fn element_text(&mut self, element: &Self::Element) -> DriverResult<String>;

    /// Attribute value of an element, `None` when absent
    async fn element_attribute(
        &mut self,
        element: &Self::Element,
        name: &str,
    ) -> DriverResult<Option<String>>;

    /// Scrolls to the bottom so lazily loaded content can appear
    async fn scroll_to_bottom(&mut self) -> DriverResult<()>;

    /// Current scroll height, `None` when the driver cannot tell
    async fn page_height(&mut self) -> DriverResult<Option<u64>>;

    /// Document title
    async fn title(&mut self) -> DriverResult<String>;

    /// URL of the loaded page
    async fn current_url(&mut self) -> DriverResult<String>;

    /// Releases the session
    async fn shutdown(&mut self) -> DriverResult<()> {
        Ok(())
    }
}
