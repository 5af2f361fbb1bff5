//! Retrieval strategies, one per escalation rung
//!
//! Each rung turns an [`AttemptRequest`] into a [`RawResponse`] or a
//! [`TransportError`]. Block classification, retries and proxy bookkeeping
//! stay in the escalating fetcher; a strategy only performs one attempt.
//!
//! The HTTP rungs share one cookie jar, so clearance cookies collected by the
//! challenge solver or the browser are replayed on later plain requests.

mod direct;
mod render;
mod solver;
mod stealth;

pub use direct::DirectStrategy;
pub use render::RenderStrategy;
pub use solver::SolverStrategy;
pub use stealth::StealthStrategy;

use crate::browser::{BrowserCookie, BrowserPool};
use crate::config::{Config, Rung};
use crate::crawler::PolitenessClock;
use crate::identity::SessionSnapshot;
use crate::proxy::Proxy;
use crate::CrawlError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a single rung attempt
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Challenge solver error: {0}")]
    Solver(String),

    #[error("Browser render produced no page")]
    RenderFailed,
}

/// Everything a rung needs for one attempt
#[derive(Debug, Clone)]
pub struct AttemptRequest {
    pub url: Url,
    /// `host[:port]` the request is paced and keyed by
    pub host: String,
    pub session: SessionSnapshot,
    pub proxy: Option<Arc<Proxy>>,
    pub timeout: Duration,
    /// Robots.txt `Crawl-delay` for the host, applied to every extra request
    pub crawl_delay: Option<Duration>,
    /// Whether robots.txt lets the site root be fetched
    pub root_allowed: bool,
}

/// What came back from one rung attempt
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub final_url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            final_url,
            headers,
            body,
        })
    }
}

/// One rung of the escalation ladder
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn rung(&self) -> Rung;

    /// Whether the fetcher should route this rung through the proxy pool
    fn uses_proxy(&self) -> bool {
        false
    }

    async fn attempt(&self, request: &AttemptRequest) -> Result<RawResponse, TransportError>;
}

/// Shape of the connection a client imitates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ClientFlavor {
    Plain,
    Browser,
}

/// HTTP clients keyed by flavor and proxy, all sharing one cookie jar
///
/// reqwest binds a proxy at build time, so each proxy gets its own client.
#[derive(Debug)]
pub struct ClientCache {
    jar: Arc<Jar>,
    clients: Mutex<HashMap<(ClientFlavor, Option<String>), Client>>,
}

impl ClientCache {
    pub fn new(jar: Arc<Jar>) -> Self {
        Self {
            jar,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    pub(crate) fn client(
        &self,
        flavor: ClientFlavor,
        proxy: Option<&Proxy>,
    ) -> Result<Client, reqwest::Error> {
        let key = (flavor, proxy.map(|p| p.endpoint.clone()));
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .cookie_provider(Arc::clone(&self.jar))
            .redirect(Policy::limited(10))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if flavor == ClientFlavor::Browser {
            builder = builder
                .use_rustls_tls()
                .http2_adaptive_window(true)
                .tcp_nodelay(true)
                .pool_idle_timeout(Duration::from_secs(90));
        }

        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy.to_reqwest()?);
        }

        let client = builder.build()?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

/// Replays cookies from a solver or browser into the shared jar
pub(crate) fn store_cookies(jar: &Jar, url: &Url, cookies: &[BrowserCookie]) {
    for cookie in cookies {
        let mut line = format!("{}={}", cookie.name, cookie.value);
        if let Some(domain) = &cookie.domain {
            line.push_str(&format!("; Domain={}", domain.trim_start_matches('.')));
        }
        line.push_str(&format!("; Path={}", cookie.path.as_deref().unwrap_or("/")));
        jar.add_cookie_str(&line, url);
    }
    if !cookies.is_empty() {
        tracing::debug!("Stored {} cookies for {}", cookies.len(), url);
    }
}

/// Builds the enabled rungs in escalation order
///
/// The order is fixed (direct, stealth, solver, browser) regardless of how
/// the rungs are listed in the configuration.
pub fn build_ladder(
    config: &Config,
    clients: Arc<ClientCache>,
    clock: Arc<PolitenessClock>,
    browser: Option<Arc<BrowserPool>>,
) -> Result<Vec<Arc<dyn FetchStrategy>>, CrawlError> {
    let mut ladder: Vec<Arc<dyn FetchStrategy>> = Vec::new();

    if config.ladder.is_enabled(Rung::Direct) {
        ladder.push(Arc::new(DirectStrategy::new(Arc::clone(&clients))));
    }
    if config.ladder.is_enabled(Rung::Stealth) {
        ladder.push(Arc::new(StealthStrategy::new(
            Arc::clone(&clients),
            Arc::clone(&clock),
        )));
    }
    if config.ladder.is_enabled(Rung::ChallengeSolver) {
        match &config.solver.endpoint {
            Some(endpoint) => ladder.push(Arc::new(SolverStrategy::new(
                endpoint,
                config.solver.max_timeout_ms,
                Arc::clone(clients.jar()),
            )?)),
            None => tracing::warn!("Challenge solver rung enabled without an endpoint, skipping"),
        }
    }
    if config.ladder.is_enabled(Rung::Browser) {
        match browser {
            Some(pool) => ladder.push(Arc::new(RenderStrategy::new(
                pool,
                Arc::clone(clients.jar()),
            ))),
            None => tracing::warn!("Browser rung enabled without a browser pool, skipping"),
        }
    }

    Ok(ladder)
}
