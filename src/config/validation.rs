use crate::config::types::{
    BoardEntry, Config, ExtractConfig, HarvestSettings, OutputConfig, PauseRange, SiteConfig,
};
use crate::harvest::Strategy;
use crate::storage::validate_table_name;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_site_config(&config.site)?;
    validate_harvest_settings(&config.harvest)?;
    validate_output_config(&config.output)?;
    validate_extract_config(&config.extract)?;
    validate_boards(&config.boards)?;
    Ok(())
}

/// Validates the forum layout section
fn validate_site_config(site: &SiteConfig) -> ConfigResult<()> {
    let url = Url::parse(&site.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if !site.feed_path.contains("{board}") {
        return Err(ConfigError::Validation(format!(
            "feed-path must contain the {{board}} placeholder, got '{}'",
            site.feed_path
        )));
    }

    if site.post_link_pattern.is_empty() {
        return Err(ConfigError::Validation(
            "post-link-pattern cannot be empty".to_string(),
        ));
    }

    validate_selector(&site.post_link_selector)?;

    Ok(())
}

/// Validates crawl-state engine tuning
fn validate_harvest_settings(settings: &HarvestSettings) -> ConfigResult<()> {
    if settings.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1, got 0".to_string(),
        ));
    }

    if settings.max_comments < 1 {
        return Err(ConfigError::Validation(
            "max-comments must be >= 1, got 0".to_string(),
        ));
    }

    if settings.stability_threshold < 1 {
        return Err(ConfigError::Validation(
            "stability-threshold must be >= 1, got 0".to_string(),
        ));
    }

    if settings.max_scroll_iterations < 1 {
        return Err(ConfigError::Validation(
            "max-scroll-iterations must be >= 1, got 0".to_string(),
        ));
    }

    if settings.board_retry_attempts < 1 {
        return Err(ConfigError::Validation(
            "board-retry-attempts must be >= 1, got 0".to_string(),
        ));
    }

    validate_pause_range("scroll-pause-ms", settings.scroll_pause_ms)?;
    validate_pause_range("post-pause-ms", settings.post_pause_ms)?;
    validate_pause_range("board-pause-ms", settings.board_pause_ms)?;

    Ok(())
}

fn validate_pause_range(name: &str, range: PauseRange) -> ConfigResult<()> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} must be [min, max] with min <= max, got [{}, {}]",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the extraction fallback chains
fn validate_extract_config(extract: &ExtractConfig) -> ConfigResult<()> {
    validate_chain("title", &extract.title)?;
    validate_chain("body", &extract.body)?;
    validate_chain("comments", &extract.comments)?;

    if extract.comments.iter().any(Strategy::is_page_title) {
        return Err(ConfigError::Validation(
            "the comments chain cannot use a page-title strategy".to_string(),
        ));
    }

    Ok(())
}

fn validate_chain(field: &str, chain: &[Strategy]) -> ConfigResult<()> {
    if chain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "extract.{} needs at least one strategy",
            field
        )));
    }

    for strategy in chain {
        if let Some(selector) = strategy.selector() {
            validate_selector(selector)?;
        }
    }

    Ok(())
}

/// Validates board entries: unique ids, usable table names
fn validate_boards(boards: &[BoardEntry]) -> ConfigResult<()> {
    let mut seen_ids = HashSet::new();
    let mut seen_tables = HashSet::new();

    for board in boards {
        if board.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "board id cannot be empty".to_string(),
            ));
        }

        if board.id.contains('/') || board.id.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "board id '{}' cannot contain '/' or whitespace",
                board.id
            )));
        }

        if !seen_ids.insert(board.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "board '{}' is listed more than once",
                board.id
            )));
        }

        validate_table_name(&board.table).map_err(|e| ConfigError::Validation(e.to_string()))?;

        if !seen_tables.insert(board.table.as_str()) {
            return Err(ConfigError::Validation(format!(
                "table '{}' is used by more than one board",
                board.table
            )));
        }

        if board.target_count == Some(0) {
            return Err(ConfigError::Validation(format!(
                "board '{}' has target-count 0",
                board.id
            )));
        }
    }

    Ok(())
}

fn validate_selector(selector: &str) -> ConfigResult<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(id: &str, table: &str) -> BoardEntry {
        BoardEntry {
            id: id.to_string(),
            table: table.to_string(),
            target_count: None,
        }
    }

    #[test]
    fn test_validate_boards() {
        assert!(validate_boards(&[board("travel", "travel"), board("food", "food")]).is_ok());
        assert!(validate_boards(&[board("旅遊", "旅遊")]).is_ok());

        assert!(validate_boards(&[board("", "t")]).is_err());
        assert!(validate_boards(&[board("a/b", "t")]).is_err());
        assert!(validate_boards(&[board("travel", "a"), board("travel", "b")]).is_err());
        assert!(validate_boards(&[board("travel", "t"), board("food", "t")]).is_err());
        assert!(validate_boards(&[board("travel", "harvest_runs")]).is_err());
    }

    #[test]
    fn test_validate_pause_range() {
        assert!(validate_pause_range("x", PauseRange::between(0, 0)).is_ok());
        assert!(validate_pause_range("x", PauseRange::between(10, 20)).is_ok());
        assert!(validate_pause_range("x", PauseRange::between(20, 10)).is_err());
    }

    #[test]
    fn test_validate_site_config() {
        assert!(validate_site_config(&SiteConfig::default()).is_ok());

        let mut site = SiteConfig::default();
        site.feed_path = "/f/travel".to_string();
        assert!(validate_site_config(&site).is_err());

        let mut site = SiteConfig::default();
        site.base_url = "ftp://example.com".to_string();
        assert!(validate_site_config(&site).is_err());

        let mut site = SiteConfig::default();
        site.post_link_selector = "a[[".to_string();
        assert!(matches!(
            validate_site_config(&site),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_comments_chain_rejects_page_title() {
        let mut extract = ExtractConfig::default();
        extract.comments.push(Strategy::PageTitle);
        assert!(validate_extract_config(&extract).is_err());

        let mut extract = ExtractConfig::default();
        extract.title.clear();
        assert!(validate_extract_config(&extract).is_err());
    }
}
