//! Static HTML page driver
//!
//! This driver fetches pages with reqwest and queries them with scraper. It
//! cannot run scripts, so "scrolling" follows the page's `rel="next"` link and
//! appends the next document to the loaded page. A paginated forum then looks
//! like one feed that grows on every scroll and stops growing on the last page.

use super::{DriverError, DriverResult, PageDriver};
use crate::config::DriverConfig;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Selector for the link to the next page of a feed
const NEXT_PAGE_SELECTOR: &str = r#"link[rel~="next"][href], a[rel~="next"][href]"#;

/// Attributes resolved to absolute URLs, as a browser reports them
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The driver configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &DriverConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// An element snapshot taken when the page was queried
#[derive(Debug, Clone, PartialEq)]
pub struct StaticElement {
    text: String,
    attributes: HashMap<String, String>,
}

impl StaticElement {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One fetched document and the URL it was finally served from
#[derive(Debug, Clone)]
struct LoadedDocument {
    url: Url,
    html: String,
}

impl LoadedDocument {
    fn new(url: Url, html: String) -> Self {
        Self { url, html }
    }
}

/// The documents loaded since the last navigation
#[derive(Debug)]
struct LoadedPage {
    url: Url,
    documents: Vec<LoadedDocument>,
    fetched: HashSet<String>,
}

/// Page driver backed by plain HTTP fetches
pub struct StaticHtmlDriver {
    client: Client,
    page: Option<LoadedPage>,
}

impl StaticHtmlDriver {
    pub fn new(config: &DriverConfig) -> DriverResult<Self> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client, page: None }
    }

    async fn fetch(&self, url: &Url) -> DriverResult<(Url, String)> {
        let navigation_error = |reason: String| DriverError::Navigation {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout(format!("fetching {}", url))
            } else {
                navigation_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(format!("HTTP {}", status.as_u16())));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        Ok((final_url, body))
    }

    fn loaded(&self) -> DriverResult<&LoadedPage> {
        self.page
            .as_ref()
            .ok_or_else(|| DriverError::Query("no page loaded".to_string()))
    }
}

#[async_trait]
impl PageDriver for StaticHtmlDriver {
    type Element = StaticElement;

    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let parsed = Url::parse(url).map_err(|e| DriverError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let (final_url, body) = self.fetch(&parsed).await?;
        debug!(url = %final_url, bytes = body.len(), "Loaded page");

        let mut fetched = HashSet::new();
        fetched.insert(parsed.to_string());
        fetched.insert(final_url.to_string());

        self.page = Some(LoadedPage {
            url: final_url.clone(),
            documents: vec![LoadedDocument::new(final_url, body)],
            fetched,
        });
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<StaticElement>> {
        let page = self.loaded()?;
        select_elements(&page.documents, selector)
    }

    async fn element_text(&mut self, element: &StaticElement) -> DriverResult<String> {
        Ok(element.text.clone())
    }

    async fn element_attribute(
        &mut self,
        element: &StaticElement,
        name: &str,
    ) -> DriverResult<Option<String>> {
        Ok(element.attributes.get(name).cloned())
    }

    async fn scroll_to_bottom(&mut self) -> DriverResult<()> {
        let next = {
            let page = self.loaded()?;
            page.documents
                .last()
                .and_then(|doc| next_page_url(&doc.html, &doc.url))
                .filter(|next| !page.fetched.contains(next.as_str()))
        };

        let Some(next) = next else {
            return Ok(());
        };

        let (final_url, body) = self.fetch(&next).await?;
        debug!(url = %final_url, bytes = body.len(), "Appended next page");

        if let Some(page) = self.page.as_mut() {
            page.fetched.insert(next.to_string());
            page.fetched.insert(final_url.to_string());
            page.documents.push(LoadedDocument::new(final_url, body));
        }
        Ok(())
    }

    async fn page_height(&mut self) -> DriverResult<Option<u64>> {
        Ok(self
            .page
            .as_ref()
            .map(|page| page.documents.iter().map(|doc| doc.html.len() as u64).sum()))
    }

    async fn title(&mut self) -> DriverResult<String> {
        let page = self.loaded()?;
        Ok(page
            .documents
            .first()
            .and_then(|doc| document_title(&doc.html))
            .unwrap_or_default())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(self
            .page
            .as_ref()
            .map(|page| page.url.to_string())
            .unwrap_or_else(|| "about:blank".to_string()))
    }
}

/// Snapshots every element matching `selector` across the loaded documents
///
/// URL attributes resolve against the document they appear in.
fn select_elements(
    documents: &[LoadedDocument],
    selector: &str,
) -> DriverResult<Vec<StaticElement>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", selector, e)))?;

    let mut elements = Vec::new();
    for loaded in documents {
        let base = &loaded.url;
        let document = Html::parse_document(&loaded.html);
        for element in document.select(&parsed) {
            let attributes = element
                .value()
                .attrs()
                .map(|(name, value)| {
                    let value = if URL_ATTRIBUTES.contains(&name) {
                        base.join(value)
                            .map(|resolved| resolved.to_string())
                            .unwrap_or_else(|_| value.to_string())
                    } else {
                        value.to_string()
                    };
                    (name.to_string(), value)
                })
                .collect();

            elements.push(StaticElement {
                text: element.text().collect::<String>(),
                attributes,
            });
        }
    }

    Ok(elements)
}

/// Extracts the `<title>` text from a document
fn document_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Finds the absolute URL of the next page, if the document links one
fn next_page_url(html: &str, base: &Url) -> Option<Url> {
    let selector = Selector::parse(NEXT_PAGE_SELECTOR).ok()?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
