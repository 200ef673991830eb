//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small paginated forum and drive the
//! static page driver through full harvest runs end-to-end.

use board_harvest::config::{parse_config, Config, PauseRange};
use board_harvest::driver::{PageDriver, StaticHtmlDriver};
use board_harvest::output::{collect_hot_keywords, format_markdown_summary, generate_summary};
use board_harvest::state::{split_comments_field, DiscoveryStop};
use board_harvest::storage::{PostTable, RunLog, RunStatus, SqliteStorage, TableMaintenance};
use board_harvest::{run_harvest, ExtractionStatus, Orchestrator};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a config pointing at the mock forum, with all pauses disabled
fn create_test_config(base_url: &str, dir: &Path, batch_size: usize) -> Config {
    let content = format!(
        r#"
[site]
base-url = "{}"
feed-path = "/f/{{board}}"
identifier = "post-id"

[harvest]
target-count = 10

[output]
database-path = "{}"
summary-path = "{}"

[[board]]
id = "travel"
table = "travel_posts"

[[board]]
id = "food"
table = "food_posts"
"#,
        base_url,
        dir.join("harvest.db").display(),
        dir.join("summary.md").display()
    );

    let mut config = parse_config(&content).expect("test config should be valid");
    config.harvest.batch_size = batch_size;
    config.harvest.stability_threshold = 2;
    config.harvest.scroll_pause_ms = PauseRange::fixed(0);
    config.harvest.post_pause_ms = PauseRange::fixed(0);
    config.harvest.board_pause_ms = PauseRange::fixed(0);
    config.harvest.feed_settle_ms = 0;
    config.harvest.board_retry_backoff_ms = 0;
    config.harvest.navigation_timeout_ms = 5_000;
    config.harvest.element_timeout_ms = 1_000;
    config
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn post_page(heading_tag: &str, heading: &str) -> ResponseTemplate {
    html(format!(
        r#"<html><head><title>{heading} | forum</title></head><body>
        <{tag}>{heading}</{tag}>
        <article>
            <p>First line of the post.</p>
            <p>Second line.</p>
        </article>
        <div data-testid="comment-content">great trip</div>
        <div data-testid="comment-content">  where
            was this?  </div>
        </body></html>"#,
        tag = heading_tag,
        heading = heading
    ))
}

/// Mounts the mock forum:
///
/// - `travel` feed over two pages linked by `rel="next"`, five posts
/// - posts 1-3 carry an `<h1>`, post 4 only an `<h2>`, post 5 answers 500
/// - the `food` feed answers 503
async fn mount_forum(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/f/travel"))
        .respond_with(html(
            r#"<html><head><title>Travel</title></head><body>
            <a href="/f/travel/p/1">Tokyo 自由行 心得</a>
            <a href="/f/travel/p/2?ref=feed">Kyoto 自由行</a>
            <a href="/f/travel/rules">Board rules</a>
            <a rel="next" href="/f/travel/older">Older posts</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/f/travel/older"))
        .respond_with(html(
            r#"<html><body>
            <a href="/f/travel/p/2">Kyoto 自由行</a>
            <a href="/f/travel/p/3">Osaka food</a>
            <a href="/f/travel/p/4">Seoul 心得</a>
            <a href="/f/travel/p/5">Broken post</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(mock_server)
        .await;

    for (id, tag, heading) in [
        ("1", "h1", "Tokyo 自由行 心得"),
        ("2", "h1", "Kyoto 自由行"),
        ("3", "h1", "Osaka food"),
        ("4", "h2", "Seoul 心得"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/f/travel/p/{}", id)))
            .respond_with(post_page(tag, heading))
            .mount(mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/f/travel/p/5"))
        .respond_with(ResponseTemplate::new(500))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/f/food"))
        .respond_with(ResponseTemplate::new(503))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_over_paginated_feed() {
    let mock_server = MockServer::start().await;
    mount_forum(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 3);
    let targets = config.board_targets();

    let report = run_harvest(&config, "test-hash", &targets)
        .await
        .expect("harvest should start");

    assert_eq!(report.boards.len(), 2);

    let travel = &report.boards[0];
    assert_eq!(travel.board_id, "travel");
    assert_eq!(travel.links_discovered, 5);
    assert_eq!(travel.discovery_stop, Some(DiscoveryStop::Stable));
    assert_eq!(travel.complete, 3);
    assert_eq!(travel.partially_failed, 1);
    assert_eq!(travel.failed, 1);
    assert_eq!(travel.persisted, 4);
    assert_eq!(travel.flushes, vec![3, 1]);
    assert!(travel.unreachable.is_none());
    assert!(travel.persistence_error.is_none());

    let food = &report.boards[1];
    assert_eq!(food.board_id, "food");
    assert!(food.unreachable.as_deref().unwrap_or("").contains("503"));
    assert_eq!(food.persisted, 0);

    let storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    assert_eq!(storage.count_rows("travel_posts").unwrap(), 4);
    assert!(!storage.table_exists("food_posts").unwrap());

    let ids = storage.read_column("travel_posts", "id").unwrap();
    for id in ["1", "2", "3", "4"] {
        assert!(ids.contains(id), "missing post {}", id);
    }
    assert!(!ids.contains("5"));

    let by_status = storage.count_by_status("travel_posts").unwrap();
    assert_eq!(by_status.get(&ExtractionStatus::Complete), Some(&3));
    assert_eq!(by_status.get(&ExtractionStatus::PartiallyFailed), Some(&1));
    assert_eq!(by_status.get(&ExtractionStatus::Failed), None);

    let titles = storage.read_titles("travel_posts").unwrap();
    assert!(titles.contains(&"Seoul 心得".to_string()));

    let run = storage.get_latest_run().unwrap().expect("run should be logged");
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.config_hash, "test-hash");
    assert!(run.finished_at.is_some());
    assert_eq!(storage.get_board_reports(run.id).unwrap(), report.boards);

    let rebuilt = generate_summary(&storage).unwrap();
    assert_eq!(rebuilt.run_id, run.id);
    assert_eq!(rebuilt.status, "partial");
    assert_eq!(rebuilt.boards, report.boards);
    assert!(format_markdown_summary(&rebuilt).contains("| travel | travel_posts | 5 | 3 | 1 | 1 | 0 | 4 | 3, 1 | stable |"));

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("| travel | travel_posts | 5 | 3 | 1 | 1 | 0 | 4 | 3, 1 | stable |"));
    assert!(summary.contains("**food** unreachable"));
}

#[tokio::test]
async fn test_comments_are_flattened_and_joined() {
    let mock_server = MockServer::start().await;
    mount_forum(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 5);
    let targets: Vec<_> = config
        .board_targets()
        .into_iter()
        .filter(|t| t.board_id == "travel")
        .collect();

    run_harvest(&config, "hash", &targets).await.unwrap();

    let storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    let comments = storage.read_column("travel_posts", "comments").unwrap();
    let field = comments
        .iter()
        .next()
        .expect("every stored post has the same comments");
    assert_eq!(split_comments_field(field), vec!["great trip", "where was this?"]);
}

#[tokio::test]
async fn test_second_run_resumes_without_refetching() {
    let mock_server = MockServer::start().await;
    mount_forum(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 3);
    let targets = config.board_targets();

    run_harvest(&config, "hash", &targets).await.unwrap();
    let second = run_harvest(&config, "hash", &targets).await.unwrap();

    // Only the post that failed last time is still new
    let travel = &second.boards[0];
    assert_eq!(travel.links_discovered, 1);
    assert_eq!(travel.failed, 1);
    assert_eq!(travel.persisted, 0);
    assert!(travel.flushes.is_empty());

    let storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    assert_eq!(storage.count_rows("travel_posts").unwrap(), 4);
    assert_eq!(storage.count_distinct_ids("travel_posts").unwrap(), 4);

    let post_requests = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/f/travel/p/1")
        .count();
    assert_eq!(post_requests, 1);
}

#[tokio::test]
async fn test_orchestrator_with_static_driver_respects_target() {
    let mock_server = MockServer::start().await;
    mount_forum(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 2);
    let mut target = config.board_targets().remove(0);
    target.target_count = 2;

    let mut storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    let driver = StaticHtmlDriver::new(&config.driver).unwrap();
    let report = Orchestrator::new(&config, driver, &mut storage)
        .run(std::slice::from_ref(&target))
        .await;

    let travel = &report.boards[0];
    assert_eq!(travel.discovery_stop, Some(DiscoveryStop::TargetReached));
    assert_eq!(travel.links_discovered, 2);
    assert_eq!(travel.persisted, 2);
    assert_eq!(travel.flushes, vec![2]);

    let ids = storage.read_column("travel_posts", "id").unwrap();
    assert!(ids.contains("1") && ids.contains("2"));
}

#[tokio::test]
async fn test_keywords_from_harvested_titles() {
    let mock_server = MockServer::start().await;
    mount_forum(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path(), 5);
    config.keywords.top = 2;
    let targets = config.board_targets();

    run_harvest(&config, "hash", &targets).await.unwrap();

    let storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    let keywords = collect_hot_keywords(&storage, &targets, &config.keywords).unwrap();
    let texts: Vec<_> = keywords.iter().map(|k| k.text.as_str()).collect();

    // "自由", "由行" and "心得" all appear twice; ties break on text
    assert_eq!(keywords.len(), 2);
    assert!(texts.iter().all(|t| ["自由", "由行", "心得"].contains(t)));
    assert!(keywords.iter().all(|k| k.size == 100));
}

#[tokio::test]
async fn test_later_pages_resolve_links_against_their_own_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/f/relay"))
        .respond_with(html(
            r#"<a class="post" href="p/1">one</a>
            <a rel="next" href="/f/relay/archive/">older</a>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/f/relay/archive/"))
        .respond_with(html(
            r#"<a class="post" href="p/7">seven</a>
            <a rel="next" href="more/">older</a>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/f/relay/archive/more/"))
        .respond_with(html(r#"<a class="post" href="../p/8">eight</a>"#.to_string()))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let mut driver = StaticHtmlDriver::with_client(reqwest::Client::new());
    driver.navigate(&format!("{}/f/relay", base)).await.unwrap();
    driver.scroll_to_bottom().await.unwrap();
    driver.scroll_to_bottom().await.unwrap();

    let mut hrefs = Vec::new();
    for element in driver.query_all("a.post").await.unwrap() {
        hrefs.push(driver.element_attribute(&element, "href").await.unwrap().unwrap());
    }

    assert_eq!(
        hrefs,
        vec![
            format!("{}/f/p/1", base),
            format!("{}/f/relay/archive/p/7", base),
            format!("{}/f/relay/archive/p/8", base),
        ]
    );
}
