use crate::harvest::Strategy;
use crate::state::BoardTarget;
use crate::url::IdentifierMode;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Board-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub harvest: HarvestSettings,

    #[serde(default)]
    pub driver: DriverConfig,

    pub output: OutputConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub keywords: KeywordConfig,

    #[serde(default, rename = "board")]
    pub boards: Vec<BoardEntry>,
}

impl Config {
    /// Resolves the configured boards into session targets, in file order
    pub fn board_targets(&self) -> Vec<BoardTarget> {
        self.boards
            .iter()
            .map(|entry| BoardTarget {
                board_id: entry.id.clone(),
                output_table: entry.table.clone(),
                target_count: entry.target_count.unwrap_or(self.harvest.target_count),
            })
            .collect()
    }
}

/// Forum layout: where feeds live and what a post link looks like
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host of the forum, e.g. "https://www.dcard.tw"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Feed path template; `{board}` is replaced by the board id
    #[serde(default = "default_feed_path")]
    pub feed_path: String,

    /// CSS selector matching candidate post anchors on the feed
    #[serde(default = "default_post_link_selector")]
    pub post_link_selector: String,

    /// Substring an href must contain to count as a post link
    #[serde(default = "default_post_link_pattern")]
    pub post_link_pattern: String,

    /// Dedup key granularity
    #[serde(default)]
    pub identifier: IdentifierMode,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            feed_path: default_feed_path(),
            post_link_selector: default_post_link_selector(),
            post_link_pattern: default_post_link_pattern(),
            identifier: IdentifierMode::default(),
        }
    }
}

impl SiteConfig {
    /// Builds the feed URL string for a board
    pub fn feed_url(&self, board_id: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.feed_path.replace("{board}", board_id)
        )
    }
}

/// Crawl-state engine tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarvestSettings {
    /// Default number of new posts to collect per board
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Records per checkpoint flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum comments kept per post
    #[serde(default = "default_max_comments")]
    pub max_comments: usize,

    /// Consecutive stable scroll iterations before discovery stops
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: u32,

    /// Hard cap on scroll iterations per feed
    #[serde(default = "default_max_scroll_iterations")]
    pub max_scroll_iterations: u32,

    /// Leading iterations in which an empty feed is not counted as stable
    #[serde(default = "default_warmup_iterations")]
    pub warmup_iterations: u32,

    /// Pause after each scroll so lazy content can render
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ms: PauseRange,

    /// Pause after navigating to a post
    #[serde(default = "default_post_pause")]
    pub post_pause_ms: PauseRange,

    /// Pause between boards
    #[serde(default = "default_board_pause")]
    pub board_pause_ms: PauseRange,

    /// Wait after the feed first loads
    #[serde(default = "default_feed_settle_ms")]
    pub feed_settle_ms: u64,

    /// Upper bound for a single navigation
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Upper bound for a single extraction strategy attempt
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,

    /// Attempts to reach a board's feed before giving up on the board
    #[serde(default = "default_board_retry_attempts")]
    pub board_retry_attempts: u32,

    /// Fixed delay between board-level attempts
    #[serde(default = "default_board_retry_backoff_ms")]
    pub board_retry_backoff_ms: u64,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            batch_size: default_batch_size(),
            max_comments: default_max_comments(),
            stability_threshold: default_stability_threshold(),
            max_scroll_iterations: default_max_scroll_iterations(),
            warmup_iterations: default_warmup_iterations(),
            scroll_pause_ms: default_scroll_pause(),
            post_pause_ms: default_post_pause(),
            board_pause_ms: default_board_pause(),
            feed_settle_ms: default_feed_settle_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            element_timeout_ms: default_element_timeout_ms(),
            board_retry_attempts: default_board_retry_attempts(),
            board_retry_backoff_ms: default_board_retry_backoff_ms(),
        }
    }
}

impl HarvestSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}

/// An inclusive millisecond range written as `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u64; 2]")]
pub struct PauseRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PauseRange {
    pub const fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    pub const fn between(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

impl From<[u64; 2]> for PauseRange {
    fn from([min_ms, max_ms]: [u64; 2]) -> Self {
        Self { min_ms, max_ms }
    }
}

/// Which page driver backs the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Plain HTTP fetches, following `rel="next"` on scroll
    #[default]
    Static,
    /// Headless Chromium (requires the `chromium` feature)
    Chromium,
}

/// Page driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DriverConfig {
    #[serde(default)]
    pub kind: DriverKind,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Per-request timeout for the static driver
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: DriverKind::default(),
            user_agent: default_user_agent(),
            headless: default_headless(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database holding one table per board
    pub database_path: String,

    /// Path to the markdown run summary
    #[serde(default = "default_summary_path")]
    pub summary_path: String,

    /// Path to the hot-keyword script
    #[serde(default = "default_keywords_path")]
    pub keywords_path: String,
}

/// Ordered fallback chains for each extracted field
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_title_chain")]
    pub title: Vec<Strategy>,

    #[serde(default = "default_body_chain")]
    pub body: Vec<Strategy>,

    #[serde(default = "default_comments_chain")]
    pub comments: Vec<Strategy>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title: default_title_chain(),
            body: default_body_chain(),
            comments: default_comments_chain(),
        }
    }
}

/// Hot-keyword export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_keyword_top")]
    pub top: usize,

    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top: default_keyword_top(),
            stopwords: default_stopwords(),
        }
    }
}

/// One board to harvest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BoardEntry {
    /// Board id as it appears in the feed path
    pub id: String,

    /// Output table name
    pub table: String,

    /// Overrides `harvest.target-count` for this board
    #[serde(default)]
    pub target_count: Option<usize>,
}

fn default_base_url() -> String {
    "https://www.dcard.tw".to_string()
}

fn default_feed_path() -> String {
    "/f/{board}?latest=true".to_string()
}

fn default_post_link_selector() -> String {
    r#"a[href*="/p/"]"#.to_string()
}

fn default_post_link_pattern() -> String {
    "/p/".to_string()
}

fn default_target_count() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    5
}

fn default_max_comments() -> usize {
    10
}

fn default_stability_threshold() -> u32 {
    5
}

fn default_max_scroll_iterations() -> u32 {
    100
}

fn default_warmup_iterations() -> u32 {
    3
}

fn default_scroll_pause() -> PauseRange {
    PauseRange::between(1_500, 3_000)
}

fn default_post_pause() -> PauseRange {
    PauseRange::between(2_000, 4_000)
}

fn default_board_pause() -> PauseRange {
    PauseRange::fixed(3_000)
}

fn default_feed_settle_ms() -> u64 {
    5_000
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_element_timeout_ms() -> u64 {
    5_000
}

fn default_board_retry_attempts() -> u32 {
    3
}

fn default_board_retry_backoff_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_summary_path() -> String {
    "./harvest-summary.md".to_string()
}

fn default_keywords_path() -> String {
    "./hot.js".to_string()
}

fn default_title_chain() -> Vec<Strategy> {
    vec![
        Strategy::text("h1"),
        Strategy::text("h2"),
        Strategy::PageTitle,
    ]
}

fn default_body_chain() -> Vec<Strategy> {
    vec![
        Strategy::text("article"),
        Strategy::text("main"),
        Strategy::attribute(r#"meta[name="description"]"#, "content"),
    ]
}

fn default_comments_chain() -> Vec<Strategy> {
    vec![
        Strategy::text(r#"[data-testid="comment-content"]"#),
        Strategy::text(".comment"),
    ]
}

fn default_keyword_top() -> usize {
    50
}

fn default_stopwords() -> Vec<String> {
    ["the", "and", "for", "with", "you", "我們", "你們", "他們", "一個", "可以", "沒有"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
