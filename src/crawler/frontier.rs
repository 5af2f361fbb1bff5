//! Crawl frontier
//!
//! A FIFO queue of canonical URLs with a seen-set for deduplication. The
//! frontier is owned by the coordinator loop alone, so nothing here is
//! synchronized.

use crate::config::CrawlerConfig;
use crate::url::{base_domain, extract_domain, is_within_domain, normalize_url};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: Url,

    /// Link distance from the seed
    pub depth: u32,

    /// Host of the page the link was found on; `None` for the seed
    pub discovered_from_host: Option<String>,
}

/// Single-domain crawl queue
#[derive(Debug)]
pub struct Frontier {
    base_domain: String,
    max_pages: usize,
    max_depth: u32,
    seen: HashSet<String>,
    pending: VecDeque<FrontierEntry>,
}

impl Frontier {
    /// Creates an empty frontier for `base_domain`
    ///
    /// A leading `www.` is dropped so the apex and `www.` host both belong
    /// to the crawl.
    pub fn new(base_domain: &str, max_pages: usize, max_depth: u32) -> Self {
        Self {
            base_domain: self::base_domain(base_domain),
            max_pages,
            max_depth,
            seen: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Creates a frontier scoped to the seed's host, with the crawler limits
    pub fn for_seed(seed: &Url, config: &CrawlerConfig) -> Self {
        let host = extract_domain(seed).unwrap_or_default();
        Self::new(&host, config.max_pages, config.max_depth)
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Adds a URL if it passes every admission rule
    ///
    /// # Returns
    ///
    /// `false`, with the frontier unchanged, when the URL does not
    /// canonicalize, the seen-set is full, the URL was already seen, its host
    /// is outside the base domain, or `depth` exceeds the maximum.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> bool {
        self.enqueue_from(url, depth, None)
    }

    /// Like [`enqueue`](Self::enqueue), recording where the link came from
    pub fn enqueue_from(&mut self, url: &str, depth: u32, from_host: Option<&str>) -> bool {
        let canonical = match normalize_url(url) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::trace!("Rejected {}: {}", url, e);
                return false;
            }
        };

        if self.seen.len() >= self.max_pages {
            return false;
        }
        if depth > self.max_depth {
            return false;
        }
        if self.seen.contains(canonical.as_str()) {
            return false;
        }
        match extract_domain(&canonical) {
            Some(host) if is_within_domain(&self.base_domain, &host) => {}
            _ => return false,
        }

        self.seen.insert(canonical.as_str().to_string());
        self.pending.push_back(FrontierEntry {
            url: canonical,
            depth,
            discovered_from_host: from_host.map(|h| h.to_string()),
        });
        true
    }

    /// Pops up to `n` entries in FIFO order
    pub fn next_batch(&mut self, n: usize) -> Vec<FrontierEntry> {
        let take = n.min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    /// True iff nothing is pending; the seen-set may still be non-empty
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
