//! Extraction strategies and fallback chains
//!
//! Each post field is resolved by an ordered list of strategies. The first
//! strategy that yields non-empty text wins; whether it was the first one in
//! the list decides if the field counts as a primary or a fallback result.

use crate::driver::{DriverResult, PageDriver};
use serde::Deserialize;
use std::time::Duration;

/// One way of reading a field from the loaded page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Strategy {
    /// Text content of the elements matching a selector
    Text { selector: String },

    /// An attribute of the elements matching a selector
    Attribute { selector: String, attribute: String },

    /// The document title
    PageTitle,
}

impl Strategy {
    pub fn text(selector: impl Into<String>) -> Self {
        Self::Text {
            selector: selector.into(),
        }
    }

    pub fn attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Attribute {
            selector: selector.into(),
            attribute: attribute.into(),
        }
    }

    pub fn is_page_title(&self) -> bool {
        matches!(self, Self::PageTitle)
    }

    /// CSS selector this strategy queries, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Text { selector } | Self::Attribute { selector, .. } => Some(selector),
            Self::PageTitle => None,
        }
    }

    /// Reads up to `limit` non-empty, trimmed values from the page
    pub async fn extract<D: PageDriver>(
        &self,
        driver: &mut D,
        limit: usize,
    ) -> DriverResult<Vec<String>> {
        let mut values = Vec::new();
        if limit == 0 {
            return Ok(values);
        }

        match self {
            Self::PageTitle => {
                let title = driver.title().await?;
                let title = title.trim();
                if !title.is_empty() {
                    values.push(title.to_string());
                }
            }
            Self::Text { selector } => {
                for element in driver.query_all(selector).await? {
                    let text = match driver.element_text(&element).await {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::debug!("Skipping unreadable element of {}: {}", selector, e);
                            continue;
                        }
                    };
                    let text = text.trim();
                    if !text.is_empty() {
                        values.push(text.to_string());
                        if values.len() == limit {
                            break;
                        }
                    }
                }
            }
            Self::Attribute {
                selector,
                attribute,
            } => {
                for element in driver.query_all(selector).await? {
                    let value = match driver.element_attribute(&element, attribute).await {
                        Ok(Some(value)) => value,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::debug!("Skipping unreadable element of {}: {}", selector, e);
                            continue;
                        }
                    };
                    let value = value.trim();
                    if !value.is_empty() {
                        values.push(value.to_string());
                        if values.len() == limit {
                            break;
                        }
                    }
                }
            }
        }

        Ok(values)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { selector } => write!(f, "text({})", selector),
            Self::Attribute {
                selector,
                attribute,
            } => write!(f, "attribute({}@{})", selector, attribute),
            Self::PageTitle => f.write_str("page-title"),
        }
    }
}

/// How a field was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The first strategy in the chain produced the value
    Primary(T),
    /// A later strategy produced the value
    Fallback(T),
    /// Every strategy came up empty
    Unresolved,
}

impl<T> Resolution<T> {
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary(_))
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Resolution<U> {
        match self {
            Self::Primary(value) => Resolution::Primary(f(value)),
            Self::Fallback(value) => Resolution::Fallback(f(value)),
            Self::Unresolved => Resolution::Unresolved,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Primary(value) | Self::Fallback(value) => Some(value),
            Self::Unresolved => None,
        }
    }
}

/// An ordered list of strategies tried until one succeeds
///
/// Each attempt is bounded by the element timeout; an attempt that errors or
/// times out falls through to the next strategy.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    field: &'static str,
    strategies: Vec<Strategy>,
    attempt_timeout: Duration,
}

impl FallbackChain {
    pub fn new(field: &'static str, strategies: Vec<Strategy>, attempt_timeout: Duration) -> Self {
        Self {
            field,
            strategies,
            attempt_timeout,
        }
    }

    /// Resolves a single value
    pub async fn resolve_first<D: PageDriver>(&self, driver: &mut D) -> Resolution<String> {
        self.resolve_all(driver, 1)
            .await
            .map(|mut values| values.swap_remove(0))
    }

    /// Resolves up to `limit` values from the first strategy yielding any
    pub async fn resolve_all<D: PageDriver>(
        &self,
        driver: &mut D,
        limit: usize,
    ) -> Resolution<Vec<String>> {
        for (index, strategy) in self.strategies.iter().enumerate() {
            let attempt =
                tokio::time::timeout(self.attempt_timeout, strategy.extract(driver, limit)).await;

            match attempt {
                Ok(Ok(values)) if !values.is_empty() => {
                    if index == 0 {
                        return Resolution::Primary(values);
                    }
                    tracing::debug!(
                        "{} resolved by fallback strategy {} ({})",
                        self.field,
                        index,
                        strategy
                    );
                    return Resolution::Fallback(values);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::warn!("{} strategy {} failed: {}", self.field, strategy, e);
                }
                Err(_) => {
                    tracing::warn!(
                        "{} strategy {} timed out after {:?}",
                        self.field,
                        strategy,
                        self.attempt_timeout
                    );
                }
            }
        }

        Resolution::Unresolved
    }
}
