//! Escalating page fetcher
//!
//! This module resolves one URL into a page or a failure reason:
//! - Robots.txt is checked once up front
//! - Each rung of the ladder is tried in order, with bounded transport retries
//! - Every try is paced by the politeness clock and may go through a proxy
//! - Blocked responses move the fetch to the next, more expensive rung
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Transport error | Retry on the same rung after the next backoff step |
//! | Retries exhausted | Advance to the next rung |
//! | Block wall (status or content) | Advance to the next rung |
//! | HTTP 429 block | Also doubles every later backoff step |
//! | Other non-2xx | Advance to the next rung |
//! | 2xx, not blocked | Done |

use crate::block::{BlockDetector, BlockEvent, BlockEventLog};
use crate::config::{Config, Rung};
use crate::crawler::PolitenessClock;
use crate::identity::SessionStore;
use crate::proxy::{ProxyHealthReport, ProxyPool};
use crate::robots::{RobotsCache, RobotsVerdict};
use crate::state::{FailureReason, FetchOutcome, PageResult};
use crate::strategy::{AttemptRequest, FetchStrategy};
use crate::url::{host_key, site_root};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// How one rung ended
enum RungOutcome {
    Success(PageResult),
    Blocked {
        event: BlockEvent,
        proxy: Option<String>,
    },
    Failed(String),
}

/// Walks the retrieval ladder for one URL at a time
///
/// Cheap to share: every fetch task of a run holds the same instance.
pub struct EscalatingFetcher {
    ladder: Vec<Arc<dyn FetchStrategy>>,
    robots: Option<RobotsCache>,
    robots_agent: String,
    clock: Arc<PolitenessClock>,
    sessions: SessionStore,
    proxies: Arc<ProxyPool>,
    detector: BlockDetector,
    backoff: Vec<Duration>,
    request_timeout: Duration,
    rotate_on_block: bool,
}

impl EscalatingFetcher {
    /// Builds a fetcher over an already assembled ladder
    ///
    /// # Errors
    ///
    /// Returns an error if the robots.txt client cannot be built.
    pub fn new(
        config: &Config,
        ladder: Vec<Arc<dyn FetchStrategy>>,
        clock: Arc<PolitenessClock>,
        proxies: Arc<ProxyPool>,
    ) -> Result<Self, reqwest::Error> {
        let request_timeout = config.ladder.request_timeout();
        let robots = if config.robots.enabled {
            Some(RobotsCache::new(&config.robots, request_timeout)?)
        } else {
            None
        };

        Ok(Self {
            ladder,
            robots,
            robots_agent: config.robots.user_agent.clone(),
            clock,
            sessions: SessionStore::new(&config.identity),
            proxies,
            detector: BlockDetector::new(&config.block),
            backoff: config.ladder.retry_backoff(),
            request_timeout,
            rotate_on_block: config.identity.rotate_on_block,
        })
    }

    /// Rungs in the order they are tried
    pub fn rungs(&self) -> Vec<Rung> {
        self.ladder.iter().map(|s| s.rung()).collect()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn block_events(&self) -> Arc<BlockEventLog> {
        self.detector.events()
    }

    pub fn proxy_health(&self) -> Vec<ProxyHealthReport> {
        self.proxies.health_snapshot()
    }

    /// Fetches one URL, escalating through the ladder as needed
    ///
    /// Never returns a raw error: every failure is mapped to a
    /// [`FailureReason`].
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let Some(host) = host_key(url) else {
            return Err(FailureReason::FetchFailed {
                detail: format!("{} has no host", url),
            });
        };

        let verdict = match &self.robots {
            Some(robots) => robots.check(url, &self.robots_agent).await,
            None => RobotsVerdict::unrestricted(),
        };
        if !verdict.allowed {
            tracing::info!("URL {} disallowed by robots.txt", url);
            return Err(FailureReason::RobotsDisallowed);
        }

        let root_allowed = match &self.robots {
            Some(robots) if url.path() != "/" => {
                robots
                    .check(&site_root(url), &self.robots_agent)
                    .await
                    .allowed
            }
            _ => true,
        };

        let mut backoff_multiplier = 1u32;
        let mut last_block: Option<(BlockEvent, Option<String>)> = None;
        let mut last_failure: Option<String> = None;

        for strategy in &self.ladder {
            let rung = strategy.rung();
            let outcome = self
                .climb(
                    strategy.as_ref(),
                    url,
                    &host,
                    verdict.crawl_delay,
                    root_allowed,
                    &mut backoff_multiplier,
                )
                .await;

            match outcome {
                RungOutcome::Success(mut page) => {
                    page.blocked_reason = last_block.map(|(event, _)| event.reason);
                    return Ok(page);
                }
                RungOutcome::Blocked { event, proxy } => {
                    if rung == Rung::Direct && self.rotate_on_block {
                        self.sessions.rotate(&host);
                    }
                    tracing::debug!(
                        "{} blocked on {} rung: {}",
                        url,
                        rung.as_str(),
                        event.reason
                    );
                    last_block = Some((event, proxy));
                }
                RungOutcome::Failed(detail) => {
                    tracing::debug!("{} failed on {} rung: {}", url, rung.as_str(), detail);
                    last_failure = Some(detail);
                }
            }
        }

        match last_block {
            Some((event, proxy)) => Err(FailureReason::BotBlocked {
                reason: event.reason,
                event,
                proxy,
            }),
            None => Err(FailureReason::FetchFailed {
                detail: last_failure
                    .unwrap_or_else(|| "no retrieval rungs enabled".to_string()),
            }),
        }
    }

    /// Tries one rung, retrying transport errors along the backoff schedule
    async fn climb(
        &self,
        strategy: &dyn FetchStrategy,
        url: &Url,
        host: &str,
        crawl_delay: Option<Duration>,
        root_allowed: bool,
        backoff_multiplier: &mut u32,
    ) -> RungOutcome {
        let rung = strategy.rung();
        let tries = self.backoff.len() + 1;
        let mut last_error = String::new();

        for attempt in 0..tries {
            let proxy = if strategy.uses_proxy() {
                self.proxies.acquire(host)
            } else {
                None
            };

            self.clock.wait_before_request(host, crawl_delay).await;
            self.clock.record_request(host);

            let request = AttemptRequest {
                url: url.clone(),
                host: host.to_string(),
                session: self.sessions.profile_for(host),
                proxy: proxy.clone(),
                timeout: self.request_timeout,
                crawl_delay,
                root_allowed,
            };

            let started = Instant::now();
            let response = match strategy.attempt(&request).await {
                Ok(response) => response,
                Err(e) => {
                    if let Some(proxy) = &proxy {
                        self.proxies.report_failure(proxy, &e.to_string());
                    }
                    last_error = e.to_string();

                    if let Some(step) = self.backoff.get(attempt) {
                        let delay = step.saturating_mul(*backoff_multiplier);
                        tracing::debug!(
                            "{} rung error on {} (try {}/{}), retrying in {:?}: {}",
                            rung.as_str(),
                            url,
                            attempt + 1,
                            tries,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
            };
            let latency = started.elapsed();

            if let Some(event) = self.detector.inspect(
                url.as_str(),
                response.status,
                &response.headers,
                &response.body,
            ) {
                if let Some(proxy) = &proxy {
                    self.proxies.report_failure(proxy, &event.reason.to_string());
                }
                if response.status == 429 {
                    *backoff_multiplier = backoff_multiplier.saturating_mul(2);
                }
                return RungOutcome::Blocked {
                    event,
                    proxy: proxy.map(|p| p.label()),
                };
            }

            // The proxy delivered a response, whatever its status
            if let Some(proxy) = &proxy {
                self.proxies.report_success(proxy);
            }

            if !response.is_success() {
                return RungOutcome::Failed(format!("HTTP {}", response.status));
            }

            self.sessions.commit(host, url.as_str());
            return RungOutcome::Success(PageResult {
                url: url.clone(),
                content_type: response.content_type(),
                final_url: response.final_url,
                final_status: response.status,
                content: response.body,
                latency_ms: latency.as_millis() as u64,
                render_mode: rung,
                blocked_reason: None,
            });
        }

        RungOutcome::Failed(last_error)
    }
}
