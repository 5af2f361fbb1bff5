//! Run-scoped robots.txt cache
//!
//! Each `(authority, user agent)` pair is fetched at most once per run, even
//! under concurrent first contact: callers share a per-key `OnceCell` and all
//! but the first wait for its result.

use crate::config::{RobotsConfig, RobotsPrecedence};
use crate::robots::ParsedRobots;
use crate::url::host_key;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Robots decision for one URL
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsVerdict {
    pub allowed: bool,
    pub crawl_delay: Option<Duration>,
    pub sitemaps: Vec<String>,
}

impl RobotsVerdict {
    /// Verdict used when robots.txt is disabled or unavailable
    pub fn unrestricted() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
            sitemaps: Vec::new(),
        }
    }
}

type CacheKey = (String, String);

/// Fetches, parses and caches robots.txt per host for the life of a run
#[derive(Debug)]
pub struct RobotsCache {
    client: Client,
    precedence: RobotsPrecedence,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Arc<ParsedRobots>>>>>,
    fetches: AtomicUsize,
}

impl RobotsCache {
    /// Creates a cache with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &RobotsConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("ladder-crawl/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self::with_client(client, config.precedence))
    }

    pub fn with_client(client: Client, precedence: RobotsPrecedence) -> Self {
        Self {
            client,
            precedence,
            entries: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Checks a URL against its host's robots.txt
    ///
    /// Never fails: a missing or unreachable robots.txt yields an
    /// unrestricted verdict.
    pub async fn check(&self, url: &Url, user_agent: &str) -> RobotsVerdict {
        let rules = self.rules_for(url, user_agent).await;
        RobotsVerdict {
            allowed: rules.is_allowed(url),
            crawl_delay: rules.crawl_delay(),
            sitemaps: rules.sitemaps().to_vec(),
        }
    }

    /// Returns the parsed rules for the URL's host, fetching them on first use
    pub async fn rules_for(&self, url: &Url, user_agent: &str) -> Arc<ParsedRobots> {
        let Some(authority) = host_key(url) else {
            return Arc::new(ParsedRobots::allow_all());
        };

        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                entries
                    .entry((authority.clone(), user_agent.to_string()))
                    .or_default(),
            )
        };

        let robots_url = format!("{}://{}/robots.txt", url.scheme(), authority);
        let rules = cell
            .get_or_init(|| async {
                Arc::new(self.fetch(&robots_url, user_agent).await)
            })
            .await;

        Arc::clone(rules)
    }

    /// Number of robots.txt fetches issued so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn fetch(&self, robots_url: &str, user_agent: &str) -> ParsedRobots {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Fetching {}", robots_url);

        let response = match self.client.get(robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(
                "robots.txt at {} returned {}, allowing all",
                robots_url,
                response.status()
            );
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => ParsedRobots::parse(&body, user_agent, self.precedence),
            Err(e) => {
                tracing::debug!("robots.txt body read failed for {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
