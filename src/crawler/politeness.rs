//! Per-host request pacing
//!
//! Every outbound request first reserves a dispatch slot for its host. Slots
//! for one host are at least `max(per_host_interval, crawl_delay)` apart and
//! each carries a random jitter drawn from `[min_delay, max_delay]`.

use crate::config::PolitenessConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct PolitenessClock {
    min_delay: Duration,
    max_delay: Duration,
    per_host_interval: Duration,
    rng: Mutex<StdRng>,
    /// Latest reserved or dispatched slot per host
    slots: Mutex<HashMap<String, Instant>>,
}

impl PolitenessClock {
    pub fn new(config: &PolitenessConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            min_delay: config.min_delay(),
            max_delay: config.max_delay().max(config.min_delay()),
            per_host_interval: config.per_host_interval(),
            rng: Mutex::new(rng),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Sleeps until the host's next slot is due
    ///
    /// Only the calling task is suspended; other hosts are unaffected.
    pub async fn wait_before_request(&self, host: &str, crawl_delay: Option<Duration>) {
        let wait = self.reserve(host, crawl_delay, Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Waiting {:?} before requesting {}", wait, host);
            tokio::time::sleep(wait).await;
        }
    }

    /// Stamps the dispatch time of a request to `host`
    pub fn record_request(&self, host: &str) {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(host.to_string()).or_insert(now);
        if *slot < now {
            *slot = now;
        }
    }

    /// Reserves the next slot for `host` and returns how long to wait for it
    pub(crate) fn reserve(
        &self,
        host: &str,
        crawl_delay: Option<Duration>,
        now: Instant,
    ) -> Duration {
        let jitter = self.jitter();
        let interval = crawl_delay
            .map_or(self.per_host_interval, |d| d.max(self.per_host_interval));

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let earliest = match slots.get(host) {
            Some(last) => (*last + interval).max(now),
            None => now,
        };
        let slot = earliest + jitter;
        slots.insert(host.to_string(), slot);

        slot.saturating_duration_since(now)
    }

    fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let millis = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(self.min_delay.as_millis()..=self.max_delay.as_millis());
        Duration::from_millis(millis as u64)
    }
}
