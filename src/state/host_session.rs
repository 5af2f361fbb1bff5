use crate::identity::IdentityProfile;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tracks one host's visitor session during crawling
///
/// A session pins an identity profile to a host so repeat requests look like a
/// returning visitor: same user agent, a growing request count, and the previous
/// page as referrer.
#[derive(Debug, Clone)]
pub struct HostSession {
    /// Host authority this session belongs to
    pub host: String,

    /// Identity presented to this host
    pub profile: Arc<IdentityProfile>,

    /// When the session (and its profile) was created
    pub created_at: Instant,

    /// Timestamp of the last successful request
    pub last_seen_at: Instant,

    /// Number of successful requests made in this session
    pub request_count: u32,

    /// URL of the previous successful request, sent as `Referer`
    pub referrer: Option<String>,
}

impl HostSession {
    /// Creates a fresh session with no request history
    pub fn new(host: impl Into<String>, profile: Arc<IdentityProfile>, now: Instant) -> Self {
        Self {
            host: host.into(),
            profile,
            created_at: now,
            last_seen_at: now,
            request_count: 0,
            referrer: None,
        }
    }

    /// Checks if the session has outlived its TTL
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    /// Records a successful request made in this session
    ///
    /// Updates the request count, referrer and last-seen time.
    pub fn record_request(&mut self, url: &str, now: Instant) {
        self.request_count += 1;
        self.referrer = Some(url.to_string());
        self.last_seen_at = now;
    }

    /// Whether requests should now signal `Sec-Fetch-Site: same-origin`
    pub fn is_same_origin(&self) -> bool {
        self.request_count > 0
    }
}
