use crate::config::Rung;
use crate::crawler::PolitenessClock;
use crate::identity::request_headers;
use crate::strategy::{
    AttemptRequest, ClientCache, ClientFlavor, FetchStrategy, RawResponse, TransportError,
};
use crate::url::site_root;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Browser-shaped HTTP request
///
/// Uses a client tuned like a browser connection and sends the full header
/// set of the profile: client hints, fetch metadata and cache directives.
/// The first visit to a host starts at the site root, the way a person
/// arriving from a search result would, so that any cookies the origin hands
/// out are already in the jar for the target request. The warm-up is skipped
/// when robots.txt disallows the root.
#[derive(Debug)]
pub struct StealthStrategy {
    clients: Arc<ClientCache>,
    clock: Arc<PolitenessClock>,
    warmed: Mutex<HashSet<String>>,
}

impl StealthStrategy {
    pub fn new(clients: Arc<ClientCache>, clock: Arc<PolitenessClock>) -> Self {
        Self {
            clients,
            clock,
            warmed: Mutex::new(HashSet::new()),
        }
    }

    /// Claims the warm-up for a host; true only for the first caller
    fn claim_warm_up(&self, host: &str) -> bool {
        self.warmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string())
    }
}

#[async_trait]
impl FetchStrategy for StealthStrategy {
    fn rung(&self) -> Rung {
        Rung::Stealth
    }

    fn uses_proxy(&self) -> bool {
        true
    }

    async fn attempt(&self, request: &AttemptRequest) -> Result<RawResponse, TransportError> {
        let client = self
            .clients
            .client(ClientFlavor::Browser, request.proxy.as_deref())?;

        let mut session = request.session.clone();

        if request.root_allowed
            && request.url.path() != "/"
            && self.claim_warm_up(&request.host)
        {
            let root = site_root(&request.url);

            tracing::debug!("Warming up {} before {}", root, request.url);
            match client
                .get(root.clone())
                .headers(request_headers(&session))
                .timeout(request.timeout)
                .send()
                .await
            {
                Ok(response) => {
                    // Drain so the connection can be reused
                    let _ = response.bytes().await;
                    session.referrer = Some(root.to_string());
                    session.same_origin = true;
                }
                Err(e) => tracing::debug!("Warm-up of {} failed: {}", root, e),
            }

            // The target request gets its own politeness slot
            self.clock
                .wait_before_request(&request.host, request.crawl_delay)
                .await;
            self.clock.record_request(&request.host);
        }

        let response = client
            .get(request.url.clone())
            .headers(request_headers(&session))
            .timeout(request.timeout)
            .send()
            .await?;

        Ok(RawResponse::read(response).await?)
    }
}
