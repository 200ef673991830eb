//! In-memory page driver for tests
//!
//! Pages are declared up front. A feed page reveals one more stage of anchors
//! on every scroll, and its height grows only while stages remain unless a
//! fixed height is set.

use super::{DriverError, DriverResult, PageDriver};
use async_trait::async_trait;
use scraper::Selector;
use std::collections::HashMap;
use std::time::Duration;

const BASE_HEIGHT: u64 = 1_000;
const STAGE_HEIGHT: u64 = 500;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ScriptedElement {
    text: String,
    attributes: HashMap<String, String>,
    /// Reads of a stale element fail, as with a detached DOM node
    stale: bool,
}

impl ScriptedElement {
    fn anchor(href: &str) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("href".to_string(), href.to_string());
        Self {
            text: href.to_string(),
            attributes,
            stale: false,
        }
    }

    fn read_check(&self) -> DriverResult<()> {
        if self.stale {
            return Err(DriverError::Query("stale element reference".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedPage {
    title: String,
    elements: HashMap<String, Vec<ScriptedElement>>,
    feed_selector: Option<String>,
    feed_stages: Vec<Vec<ScriptedElement>>,
    height_known: bool,
    fixed_height: Option<u64>,
}

impl ScriptedPage {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            elements: HashMap::new(),
            feed_selector: None,
            feed_stages: Vec::new(),
            height_known: true,
            fixed_height: None,
        }
    }

    /// A feed whose `stages[i]` hrefs appear after scroll `i + 1`
    pub(crate) fn feed(selector: &str, stages: Vec<Vec<&str>>) -> Self {
        let mut page = Self::new("feed");
        page.feed_selector = Some(selector.to_string());
        page.feed_stages = stages
            .into_iter()
            .map(|hrefs| hrefs.into_iter().map(ScriptedElement::anchor).collect())
            .collect();
        page
    }

    pub(crate) fn with_texts(mut self, selector: &str, texts: &[&str]) -> Self {
        let elements = texts
            .iter()
            .map(|text| ScriptedElement {
                text: text.to_string(),
                ..ScriptedElement::default()
            })
            .collect();
        self.elements.insert(selector.to_string(), elements);
        self
    }

    pub(crate) fn with_attributes(mut self, selector: &str, name: &str, values: &[&str]) -> Self {
        let elements = values
            .iter()
            .map(|value| {
                let mut attributes = HashMap::new();
                attributes.insert(name.to_string(), value.to_string());
                ScriptedElement {
                    attributes,
                    ..ScriptedElement::default()
                }
            })
            .collect();
        self.elements.insert(selector.to_string(), elements);
        self
    }

    /// Makes `page_height` report an unknown height
    pub(crate) fn without_height(mut self) -> Self {
        self.height_known = false;
        self
    }

    /// Pins `page_height` to `height` however many stages are revealed
    pub(crate) fn with_fixed_height(mut self, height: u64) -> Self {
        self.fixed_height = Some(height);
        self
    }

    /// Makes reads of the `index`-th element matching `selector` fail
    ///
    /// For the feed selector the index counts across all stages.
    pub(crate) fn with_stale_element(mut self, selector: &str, index: usize) -> Self {
        let element = if self.feed_selector.as_deref() == Some(selector) {
            self.feed_stages.iter_mut().flatten().nth(index)
        } else {
            self.elements
                .get_mut(selector)
                .and_then(|elements| elements.get_mut(index))
        };
        if let Some(element) = element {
            element.stale = true;
        }
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedDriver {
    pages: HashMap<String, ScriptedPage>,
    failures: HashMap<String, u32>,
    delays: HashMap<String, Duration>,
    failing_queries: u32,
    current: Option<String>,
    revealed: usize,
    pub(crate) navigations: Vec<String>,
    pub(crate) scrolls: u32,
    pub(crate) shut_down: bool,
}

impl ScriptedDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, url: &str, page: ScriptedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Every navigation to `url` fails
    pub(crate) fn unreachable(self, url: &str) -> Self {
        self.failing_first(url, u32::MAX)
    }

    /// The first `attempts` navigations to `url` fail
    pub(crate) fn failing_first(mut self, url: &str, attempts: u32) -> Self {
        self.failures.insert(url.to_string(), attempts);
        self
    }

    /// Navigation to `url` takes `delay`
    pub(crate) fn slow(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// The next `count` element queries fail
    pub(crate) fn failing_queries(mut self, count: u32) -> Self {
        self.failing_queries = count;
        self
    }

    fn page(&self) -> DriverResult<&ScriptedPage> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .ok_or_else(|| DriverError::Query("no page loaded".to_string()))
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    type Element = ScriptedElement;

    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.navigations.push(url.to_string());

        if let Some(delay) = self.delays.get(url).copied() {
            tokio::time::sleep(delay).await;
        }

        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
        }

        if !self.pages.contains_key(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                reason: "HTTP 404".to_string(),
            });
        }

        self.current = Some(url.to_string());
        self.revealed = 0;
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<ScriptedElement>> {
        Selector::parse(selector)
            .map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", selector, e)))?;

        if self.failing_queries > 0 {
            self.failing_queries -= 1;
            return Err(DriverError::Query("stale element".to_string()));
        }

        let revealed = self.revealed;
        let page = self.page()?;
        if page.feed_selector.as_deref() == Some(selector) {
            let visible = revealed.min(page.feed_stages.len());
            return Ok(page.feed_stages[..visible].concat());
        }

        Ok(page.elements.get(selector).cloned().unwrap_or_default())
    }

    async fn element_text(&mut self, element: &ScriptedElement) -> DriverResult<String> {
        element.read_check()?;
        Ok(element.text.clone())
    }

    async fn element_attribute(
        &mut self,
        element: &ScriptedElement,
        name: &str,
    ) -> DriverResult<Option<String>> {
        element.read_check()?;
        Ok(element.attributes.get(name).cloned())
    }

    async fn scroll_to_bottom(&mut self) -> DriverResult<()> {
        self.scrolls += 1;
        self.revealed += 1;
        Ok(())
    }

    async fn page_height(&mut self) -> DriverResult<Option<u64>> {
        let revealed = self.revealed;
        let page = self.page()?;
        if !page.height_known {
            return Ok(None);
        }
        if let Some(height) = page.fixed_height {
            return Ok(Some(height));
        }
        let stages = revealed.min(page.feed_stages.len()) as u64;
        Ok(Some(BASE_HEIGHT + STAGE_HEIGHT * stages))
    }

    async fn title(&mut self) -> DriverResult<String> {
        Ok(self.page()?.title.clone())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(self
            .current
            .clone()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn shutdown(&mut self) -> DriverResult<()> {
        self.shut_down = true;
        Ok(())
    }
}
