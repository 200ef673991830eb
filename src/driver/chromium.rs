//! Headless Chromium page driver
//!
//! Renders pages in a real browser through the DevTools protocol, so feeds
//! that lazy-load on scroll behave exactly as they do for a reader.

use super::{DriverError, DriverResult, PageDriver};
use crate::config::DriverConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";
const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

fn query_error(e: CdpError) -> DriverError {
    DriverError::Query(e.to_string())
}

/// Page driver backed by a headless Chromium session
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
}

impl ChromiumDriver {
    /// Launches a browser and opens one blank tab
    pub async fn launch(config: &DriverConfig) -> DriverResult<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", config.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        debug!(headless = config.headless, "Launched Chromium");

        Ok(Self {
            browser,
            page,
            handler: Some(handle),
        })
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<Element>> {
        self.page.find_elements(selector).await.map_err(query_error)
    }

    async fn element_text(&mut self, element: &Element) -> DriverResult<String> {
        Ok(element
            .inner_text()
            .await
            .map_err(query_error)?
            .unwrap_or_default())
    }

    async fn element_attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> DriverResult<Option<String>> {
        element.attribute(name).await.map_err(query_error)
    }

    async fn scroll_to_bottom(&mut self) -> DriverResult<()> {
        self.page
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn page_height(&mut self) -> DriverResult<Option<u64>> {
        let height = self
            .page
            .evaluate(HEIGHT_SCRIPT)
            .await
            .map_err(query_error)?
            .into_value::<u64>()
            .ok();
        Ok(height)
    }

    async fn title(&mut self) -> DriverResult<String> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(query_error)?
            .unwrap_or_default())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(query_error)?
            .unwrap_or_default())
    }

    async fn shutdown(&mut self) -> DriverResult<()> {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser did not close cleanly");
        }
        if let Some(handle) = self.handler.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Browser handler task failed");
            }
        }
        Ok(())
    }
}
