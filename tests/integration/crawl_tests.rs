//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use ladder_crawl::block::{BlockEventLog, BlockReason};
use ladder_crawl::config::{load_config, Config, PolitenessConfig, Rung};
use ladder_crawl::crawler::{Coordinator, CrawlReport, LinkExtractor};
use ladder_crawl::output::collect_statistics;
use ladder_crawl::state::{FailureReason, UrlOutcome};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration with pacing and retries disabled so tests run fast
fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.crawler.seed = Some(format!("{}/", server.uri()));
    config.crawler.concurrency = 2;
    config.politeness = PolitenessConfig {
        min_delay_ms: 0,
        max_delay_ms: 0,
        per_host_interval_ms: 0,
    };
    config.identity.seed = Some(11);
    config.ladder.retry_backoff_ms = Vec::new();
    config.ladder.request_timeout_secs = 5;
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn crawl(config: Config) -> (CrawlReport, Arc<BlockEventLog>) {
    let mut coordinator = Coordinator::new(config, Arc::new(LinkExtractor))
        .await
        .expect("coordinator should start");
    let report = coordinator.run().await;
    coordinator.shutdown().await;
    (report, coordinator.block_events())
}

fn find<'a>(report: &'a CrawlReport, route: &str) -> &'a UrlOutcome {
    report
        .outcomes
        .iter()
        .find(|o| o.url.path() == route)
        .unwrap_or_else(|| panic!("no outcome for {}", route))
}

#[tokio::test]
async fn test_crawl_single_domain() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/a">A</a>
            <a href="/b">B</a>
            <a href="https://external.example.org/">External</a>
        </body></html>"#,
    )
    .await;
    mount_html(&server, "/a", r#"<a href="/b">B again</a><a href="/a#top">Self</a>"#).await;
    mount_html(&server, "/b", "<p>Leaf page</p>").await;

    let (report, events) = crawl(test_config(&server)).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.success_count(), 3);
    assert_eq!(report.urls_discovered, 3);
    assert!(events.is_empty());

    for outcome in &report.outcomes {
        let page = outcome.result.as_ref().expect("page should be fetched");
        assert_eq!(page.render_mode, Rung::Direct);
        assert_eq!(page.final_status, 200);
        assert!(page.blocked_reason.is_none());
    }

    assert_eq!(find(&report, "/").depth, 0);
    assert_eq!(find(&report, "/a").depth, 1);
    assert_eq!(find(&report, "/b").depth, 1);
}

#[tokio::test]
async fn test_robots_disallowed_url_is_never_fetched() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_html(
        &server,
        "/",
        r#"<a href="/private/report">Private</a><a href="/public">Public</a>"#,
    )
    .await;
    mount_html(&server, "/public", "<p>ok</p>").await;
    Mock::given(method("GET"))
        .and(path("/private/report"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let (report, _) = crawl(test_config(&server)).await;

    assert_eq!(report.outcomes.len(), 3);
    assert!(matches!(
        find(&report, "/private/report").result,
        Err(FailureReason::RobotsDisallowed)
    ));
    assert!(find(&report, "/public").result.is_ok());
}

#[tokio::test]
async fn test_blocked_direct_escalates_to_stealth() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_html(&server, "/", r#"<a href="/guarded">Guarded</a>"#).await;

    // Only the stealth rung sends fetch metadata headers
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .and(header_exists("sec-fetch-mode"))
        .respond_with(html("<p>welcome</p>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (report, events) = crawl(test_config(&server)).await;

    let page = find(&report, "/guarded")
        .result
        .as_ref()
        .expect("stealth rung should succeed");
    assert_eq!(page.render_mode, Rung::Stealth);
    assert_eq!(page.blocked_reason, Some(BlockReason::HttpStatus(503)));
    assert_eq!(page.text(), "<p>welcome</p>");

    let recorded = events.recent();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status_code, 503);
    assert!(recorded[0].url.ends_with("/guarded"));
}

#[tokio::test]
async fn test_every_rung_blocked() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_html(&server, "/", r#"<a href="/wall">Wall</a>"#).await;
    mount_html(
        &server,
        "/wall",
        "<html><body>Please verify you are human to continue</body></html>",
    )
    .await;

    let (report, events) = crawl(test_config(&server)).await;

    match &find(&report, "/wall").result {
        Err(failure @ FailureReason::BotBlocked { reason, proxy, .. }) => {
            assert_eq!(*reason, BlockReason::CaptchaContent);
            assert!(proxy.is_none());
            assert_eq!(failure.to_string(), "bot_blocked:captcha_content");
        }
        other => panic!("expected bot_blocked, got {:?}", other),
    }
    assert_eq!(events.len(), 2);

    let stats = collect_statistics(&report, &events, Vec::new());
    assert_eq!(
        stats.failures_by_reason.get("bot_blocked:captcha_content"),
        Some(&1)
    );
    assert_eq!(stats.pages_by_render_mode.get(&Rung::Direct), Some(&1));
}

#[tokio::test]
async fn test_solver_rung_fetches_blocked_page() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_html(&server, "/", r#"<a href="/locked">Locked</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/locked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let locked_url = format!("{}/locked", server.uri());
    Mock::given(method("POST"))
        .and(path("/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "Challenge solved!",
            "solution": {
                "url": locked_url,
                "status": 200,
                "headers": { "content-type": "text/html" },
                "response": "<html><body>unlocked</body></html>",
                "cookies": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.ladder.rungs = vec![Rung::Direct, Rung::Stealth, Rung::ChallengeSolver];
    config.solver.endpoint = Some(format!("{}/v1", server.uri()));

    let (report, events) = crawl(config).await;

    let page = find(&report, "/locked")
        .result
        .as_ref()
        .expect("solver rung should succeed");
    assert_eq!(page.render_mode, Rung::ChallengeSolver);
    assert_eq!(page.final_url, locked_url);
    assert!(page.text().contains("unlocked"));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_max_pages_bounds_the_crawl() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_html(&server, "/", &links).await;
    for i in 0..10 {
        mount_html(&server, &format!("/p{}", i), "<p>page</p>").await;
    }

    let mut config = test_config(&server);
    config.crawler.max_pages = 4;

    let (report, _) = crawl(config).await;

    assert_eq!(report.urls_discovered, 4);
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.success_count(), 4);
    assert_eq!(report.outcomes[0].links_found, 10);
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_html(&server, "/", r#"<a href="/deep/1">1</a>"#).await;
    mount_html(&server, "/deep/1", r#"<a href="/deep/2">2</a>"#).await;
    mount_html(&server, "/deep/2", "<p>too deep</p>").await;

    let toml = format!(
        r#"
[crawler]
seed = "{}/"
max-depth = 1
concurrency = 1

[politeness]
min-delay-ms = 0
max-delay-ms = 0
per-host-interval-ms = 0

[identity]
seed = 5

[ladder]
rungs = ["direct"]
retry-backoff-ms = []
"#,
        server.uri()
    );
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    file.flush().unwrap();

    let config = load_config(file.path()).unwrap();
    let (report, _) = crawl(config).await;

    let paths: Vec<&str> = report.outcomes.iter().map(|o| o.url.path()).collect();
    assert_eq!(paths, vec!["/", "/deep/1"]);
}
