//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Seeding and draining the frontier
//! - Dispatching fetches under a global concurrency bound
//! - Handing pages to the extractor and feeding links back
//! - Stopping cleanly without abandoning in-flight fetches

use crate::block::BlockEventLog;
use crate::browser::BrowserPool;
use crate::config::{validate, Config, CrawlerConfig, Rung};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::{EscalatingFetcher, Extractor, LinkExtractor, PolitenessClock};
use crate::proxy::{ProxyHealthReport, ProxyPool};
use crate::state::{FailureReason, FetchOutcome, PageResult, UrlOutcome};
use crate::strategy::{build_ladder, ClientCache};
use crate::url::{host_key, normalize_url};
use crate::{ConfigError, CrawlError};
use reqwest::cookie::Jar;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

/// Timeout for one proxy health probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Stops a running crawl from another task
///
/// In-flight fetches are allowed to finish; no new batches are pulled.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested, draining in-flight fetches");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// One entry per dequeued URL, in completion order
    pub outcomes: Vec<UrlOutcome>,

    /// Distinct URLs the frontier accepted
    pub urls_discovered: usize,

    /// URLs still queued when the run ended (non-zero only after a stop)
    pub urls_pending: usize,

    pub elapsed: Duration,
    pub stopped: bool,
}

impl CrawlReport {
    /// Successfully fetched pages
    pub fn pages(&self) -> impl Iterator<Item = &PageResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn success_count(&self) -> usize {
        self.pages().count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    frontier: Frontier,
    fetcher: Arc<EscalatingFetcher>,
    extractor: Arc<dyn Extractor>,
    permits: Arc<Semaphore>,
    stop: StopHandle,
    proxies: Option<Arc<ProxyPool>>,
    browser: Option<Arc<BrowserPool>>,
}

impl Coordinator {
    /// Creates a coordinator and every per-run component from configuration
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, no seed is set, the seed is
    /// outside the frontier's admission rules, an HTTP client cannot be
    /// built, or the browser pool cannot be launched.
    pub async fn new(config: Config, extractor: Arc<dyn Extractor>) -> Result<Self, CrawlError> {
        validate(&config)?;

        let seed = config.crawler.seed.clone().ok_or_else(|| {
            ConfigError::Validation("crawler.seed is required to start a crawl".to_string())
        })?;

        let clock = Arc::new(PolitenessClock::new(
            &config.politeness,
            config.identity.seed,
        ));
        let proxies = Arc::new(ProxyPool::new(&config.proxy));
        let clients = Arc::new(ClientCache::new(Arc::new(Jar::default())));

        let browser = if config.ladder.is_enabled(Rung::Browser) {
            Some(Arc::new(BrowserPool::launch(&config.browser, config.identity.seed).await?))
        } else {
            None
        };

        let ladder = build_ladder(&config, clients, Arc::clone(&clock), browser.clone())?;
        let fetcher = EscalatingFetcher::new(&config, ladder, clock, Arc::clone(&proxies))?;
        tracing::info!(
            "Escalation ladder: {}",
            fetcher
                .rungs()
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let mut coordinator =
            Self::from_parts(&config.crawler, &seed, Arc::new(fetcher), extractor)?;
        if !proxies.is_empty() {
            coordinator.proxies = Some(proxies);
        }
        coordinator.browser = browser;
        Ok(coordinator)
    }

    /// Builds a coordinator around an existing fetcher
    pub fn from_parts(
        crawler: &CrawlerConfig,
        seed: &str,
        fetcher: Arc<EscalatingFetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, CrawlError> {
        let seed_url = normalize_url(seed)?;
        let mut frontier = Frontier::for_seed(&seed_url, crawler);
        if !frontier.enqueue(seed_url.as_str(), 0) {
            return Err(CrawlError::SeedRejected {
                url: seed.to_string(),
            });
        }

        Ok(Self {
            frontier,
            fetcher,
            extractor,
            permits: Arc::new(Semaphore::new(crawler.concurrency.max(1))),
            stop: StopHandle::default(),
            proxies: None,
            browser: None,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Recent block walls, oldest first
    pub fn block_events(&self) -> Arc<BlockEventLog> {
        self.fetcher.block_events()
    }

    pub fn proxy_health(&self) -> Vec<ProxyHealthReport> {
        self.fetcher.proxy_health()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Runs the crawl loop until the frontier drains or a stop is requested
    ///
    /// Per-URL failures are recorded in the report and never abort the run.
    pub async fn run(&mut self) -> CrawlReport {
        tracing::info!("Starting crawl of {}", self.frontier.base_domain());

        let started = Instant::now();
        let mut outcomes = Vec::new();
        let mut in_flight: JoinSet<FetchOutcome> = JoinSet::new();
        let mut entries: HashMap<Id, FrontierEntry> = HashMap::new();

        let health_task = self.proxies.as_ref().map(|pool| {
            let probe = Arc::new(pool.http_probe(PROBE_TIMEOUT));
            pool.spawn_health_checks(probe)
        });

        loop {
            if !self.stop.is_stopped() {
                let budget = self.permits.available_permits();
                for entry in self.frontier.next_batch(budget) {
                    let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                        break;
                    };
                    let fetcher = Arc::clone(&self.fetcher);
                    let url = entry.url.clone();
                    let task = in_flight.spawn(async move {
                        let _permit = permit;
                        fetcher.fetch(&url).await
                    });
                    entries.insert(task.id(), entry);
                }
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => {
                    tracing::error!("Fetch task failed: {}", e);
                    let outcome = Err(FailureReason::FetchFailed {
                        detail: format!("fetch task failed: {}", e),
                    });
                    (e.id(), outcome)
                }
            };
            let Some(entry) = entries.remove(&id) else {
                tracing::error!("Finished fetch task {} has no frontier entry", id);
                continue;
            };

            self.complete(entry, outcome, &mut outcomes);
            if outcomes.len() % 10 == 0 {
                let rate = outcomes.len() as f64 / started.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} URLs done, {} in frontier, {:.2} URLs/sec",
                    outcomes.len(),
                    self.frontier.pending_count(),
                    rate
                );
            }
        }

        if let Some(task) = health_task {
            task.abort();
        }

        let report = CrawlReport {
            urls_discovered: self.frontier.seen_count(),
            urls_pending: self.frontier.pending_count(),
            elapsed: started.elapsed(),
            stopped: self.stop.is_stopped(),
            outcomes,
        };
        tracing::info!(
            "Crawl finished: {} fetched, {} failed in {:?}",
            report.success_count(),
            report.failure_count(),
            report.elapsed
        );
        report
    }

    /// Releases external resources (browser sessions)
    pub async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.shutdown().await;
        }
    }

    fn complete(
        &mut self,
        entry: FrontierEntry,
        result: FetchOutcome,
        outcomes: &mut Vec<UrlOutcome>,
    ) {
        let links_found = match &result {
            Ok(page) => {
                let links = self.extractor.extract(page);
                let from_host = host_key(&entry.url);
                let accepted = links
                    .iter()
                    .filter(|link| {
                        self.frontier
                            .enqueue_from(link, entry.depth + 1, from_host.as_deref())
                    })
                    .count();
                tracing::debug!(
                    "Fetched {} via {} ({} links, {} new)",
                    entry.url,
                    page.render_mode.as_str(),
                    links.len(),
                    accepted
                );
                links.len()
            }
            Err(reason) if reason.is_policy() => {
                tracing::debug!("Skipped {}: {}", entry.url, reason);
                0
            }
            Err(reason) => {
                tracing::warn!("Failed to fetch {}: {}", entry.url, reason);
                0
            }
        };

        outcomes.push(UrlOutcome {
            url: entry.url,
            depth: entry.depth,
            result,
            links_found,
        });
    }
}

/// Runs a complete crawl with the default link extractor
///
/// # Example
///
/// ```no_run
/// use ladder_crawl::config::load_config;
/// use ladder_crawl::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("crawl.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} pages fetched", report.success_count());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    let mut coordinator = Coordinator::new(config, Arc::new(LinkExtractor)).await?;
    let report = coordinator.run().await;
    coordinator.shutdown().await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolitenessConfig;
    use crate::strategy::{AttemptRequest, FetchStrategy, RawResponse, TransportError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use std::sync::atomic::AtomicUsize;

    /// Serves a fixed in-memory site; unknown paths are 404
    struct SiteRung {
        pages: HashMap<&'static str, (u16, &'static str)>,
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl SiteRung {
        fn new(pages: &[(&'static str, u16, &'static str)], delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                pages: pages.iter().map(|(p, s, b)| (*p, (*s, *b))).collect(),
                delay,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FetchStrategy for SiteRung {
        fn rung(&self) -> Rung {
            Rung::Direct
        }

        async fn attempt(&self, request: &AttemptRequest) -> Result<RawResponse, TransportError> {
            if request.url.path() == "/crash" {
                panic!("rung crashed");
            }
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let (status, body) = self
                .pages
                .get(request.url.path())
                .copied()
                .unwrap_or((404, "not found"));
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
            Ok(RawResponse {
                status,
                final_url: request.url.to_string(),
                headers,
                body: Bytes::from_static(body.as_bytes()),
            })
        }
    }

    fn config(concurrency: usize, max_pages: usize, max_depth: u32) -> Config {
        let mut config = Config::default();
        config.crawler.concurrency = concurrency;
        config.crawler.max_pages = max_pages;
        config.crawler.max_depth = max_depth;
        config.robots.enabled = false;
        config.identity.seed = Some(3);
        config.ladder.retry_backoff_ms = Vec::new();
        config.politeness = PolitenessConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            per_host_interval_ms: 0,
        };
        config
    }

    fn coordinator(config: &Config, site: Arc<SiteRung>) -> Coordinator {
        let clock = Arc::new(PolitenessClock::new(&config.politeness, Some(1)));
        let proxies = Arc::new(ProxyPool::new(&config.proxy));
        let ladder: Vec<Arc<dyn FetchStrategy>> = vec![site];
        let fetcher = EscalatingFetcher::new(config, ladder, clock, proxies).unwrap();
        Coordinator::from_parts(
            &config.crawler,
            "https://example.com/",
            Arc::new(fetcher),
            Arc::new(LinkExtractor),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_crawl_follows_links() {
        let site = SiteRung::new(
            &[
                ("/", 200, r#"<a href="/a">A</a><a href="/b">B</a><a href="https://other.com/">X</a>"#),
                ("/a", 200, r#"<a href="/">home</a><a href="/c">C</a>"#),
                ("/b", 200, "<p>leaf</p>"),
                ("/c", 200, "<p>leaf</p>"),
            ],
            Duration::ZERO,
        );
        let config = config(2, 100, 5);
        let mut coordinator = coordinator(&config, site);

        let report = coordinator.run().await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.success_count(), 4);
        assert_eq!(report.urls_discovered, 4);
        assert!(!report.stopped);

        let depth_of = |path: &str| {
            report
                .outcomes
                .iter()
                .find(|o| o.url.path() == path)
                .map(|o| o.depth)
        };
        assert_eq!(depth_of("/"), Some(0));
        assert_eq!(depth_of("/a"), Some(1));
        assert_eq!(depth_of("/c"), Some(2));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let site = SiteRung::new(
            &[
                ("/", 200, r#"<a href="/missing">M</a><a href="/blocked">B</a><a href="/ok">O</a>"#),
                ("/blocked", 403, "denied"),
                ("/ok", 200, "fine"),
            ],
            Duration::ZERO,
        );
        let config = config(4, 100, 5);
        let mut coordinator = coordinator(&config, site);

        let report = coordinator.run().await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 2);

        let blocked = report
            .outcomes
            .iter()
            .find(|o| o.url.path() == "/blocked")
            .unwrap();
        assert!(matches!(
            blocked.result,
            Err(FailureReason::BotBlocked { .. })
        ));
        assert_eq!(coordinator.block_events().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_fetch_is_recorded() {
        let site = SiteRung::new(
            &[
                ("/", 200, r#"<a href="/crash">C</a><a href="/ok">O</a>"#),
                ("/ok", 200, "fine"),
            ],
            Duration::ZERO,
        );
        let config = config(2, 100, 5);
        let mut coordinator = coordinator(&config, site);

        let report = coordinator.run().await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.success_count(), 2);
        let crashed = report
            .outcomes
            .iter()
            .find(|o| o.url.path() == "/crash")
            .expect("crashed fetch should still have an outcome");
        assert_eq!(crashed.depth, 1);
        match &crashed.result {
            Err(FailureReason::FetchFailed { detail }) => assert!(detail.contains("panicked")),
            other => panic!("expected fetch_failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_depth_and_page_limits() {
        let site = SiteRung::new(
            &[
                ("/", 200, r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a>"#),
                ("/1", 200, r#"<a href="/1/deeper">d</a>"#),
            ],
            Duration::ZERO,
        );

        let config = config(1, 3, 5);
        let report = coordinator(&config, Arc::clone(&site)).run().await;
        assert_eq!(report.urls_discovered, 3);
        assert_eq!(report.outcomes.len(), 3);

        let config = self::config(1, 100, 1);
        let report = coordinator(&config, site).run().await;
        assert!(report.outcomes.iter().all(|o| o.depth <= 1));
        assert!(!report.outcomes.iter().any(|o| o.url.path() == "/1/deeper"));
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let body = r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/4">4</a>
            <a href="/5">5</a><a href="/6">6</a>"#;
        let site = SiteRung::new(
            &[
                ("/", 200, body),
                ("/1", 200, ""),
                ("/2", 200, ""),
                ("/3", 200, ""),
                ("/4", 200, ""),
                ("/5", 200, ""),
                ("/6", 200, ""),
            ],
            Duration::from_millis(30),
        );
        let config = config(2, 100, 5);
        let mut coordinator = coordinator(&config, Arc::clone(&site));

        let report = coordinator.run().await;

        assert_eq!(report.success_count(), 7);
        assert!(site.max_active.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_stop_before_run_fetches_nothing_new() {
        let site = SiteRung::new(&[("/", 200, r#"<a href="/a">A</a>"#)], Duration::ZERO);
        let config = config(1, 100, 5);
        let mut coordinator = coordinator(&config, site);

        coordinator.stop_handle().stop();
        let report = coordinator.run().await;

        assert!(report.stopped);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.urls_pending, 1);
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_finish() {
        let site = SiteRung::new(
            &[
                ("/", 200, r#"<a href="/a">A</a><a href="/b">B</a>"#),
                ("/a", 200, ""),
                ("/b", 200, ""),
            ],
            Duration::from_millis(50),
        );
        let config = config(1, 100, 5);
        let mut coordinator = coordinator(&config, site);
        let stop = coordinator.stop_handle();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.stop();
        });
        let report = coordinator.run().await;
        stopper.await.unwrap();

        // The seed was in flight when the stop arrived and still completed
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].result.is_ok());
        assert_eq!(report.urls_pending, 2);
    }

    #[test]
    fn test_seed_outside_limits_is_rejected() {
        let mut config = config(1, 100, 5);
        config.crawler.max_pages = 0;
        let clock = Arc::new(PolitenessClock::new(&config.politeness, Some(1)));
        let proxies = Arc::new(ProxyPool::new(&config.proxy));
        let fetcher = EscalatingFetcher::new(&config, Vec::new(), clock, proxies).unwrap();

        let result = Coordinator::from_parts(
            &config.crawler,
            "https://example.com/",
            Arc::new(fetcher),
            Arc::new(LinkExtractor),
        );
        assert!(matches!(result, Err(CrawlError::SeedRejected { .. })));
    }

    #[tokio::test]
    async fn test_new_requires_seed() {
        let config = config(1, 100, 5);
        let result = Coordinator::new(config, Arc::new(LinkExtractor)).await;
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }
}
