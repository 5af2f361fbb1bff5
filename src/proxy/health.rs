//! Periodic proxy health checks
//!
//! Banned proxies are probed on a fixed interval, independent of request
//! traffic. A successful probe clears the failure count and returns the proxy
//! to rotation; a failed probe leaves it banned and is never surfaced.

use crate::proxy::pool::{Proxy, ProxyPool};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Connectivity probe run through a proxy
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns true if the proxy can reach the outside world
    async fn probe(&self, proxy: &Proxy) -> bool;
}

/// Probes by fetching a stable URL through the proxy
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, proxy: &Proxy) -> bool {
        let client = match proxy.to_reqwest().and_then(|p| {
            reqwest::Client::builder()
                .proxy(p)
                .timeout(self.timeout)
                .build()
        }) {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!("Cannot build probe client for {}: {}", proxy, e);
                return false;
            }
        };

        match client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health probe through {} failed: {}", proxy, e);
                false
            }
        }
    }
}

impl ProxyPool {
    /// Probes every unhealthy proxy once
    ///
    /// # Returns
    ///
    /// The number of proxies restored to rotation
    pub async fn run_health_checks_once(&self, probe: &dyn HealthProbe) -> usize {
        let mut restored = 0;

        for proxy in self.proxies().iter().filter(|p| !p.is_healthy()) {
            proxy.mark_health_checked(Instant::now());
            if probe.probe(proxy).await {
                proxy.restore();
                restored += 1;
                tracing::info!("Proxy {} passed health check, back in rotation", proxy);
            } else {
                tracing::debug!("Proxy {} still unhealthy", proxy);
            }
        }

        restored
    }

    /// Spawns the background health-check loop
    ///
    /// The loop runs until the returned handle is aborted.
    pub fn spawn_health_checks(self: &Arc<Self>, probe: Arc<dyn HealthProbe>) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        let period = pool.health_check_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                pool.run_health_checks_once(probe.as_ref()).await;
            }
        })
    }

    /// Default probe for this pool's configured probe URL
    pub fn http_probe(&self, timeout: Duration) -> HttpProbe {
        HttpProbe::new(self.probe_url.clone(), timeout)
    }
}
