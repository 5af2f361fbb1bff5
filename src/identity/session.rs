use crate::config::IdentityConfig;
use crate::identity::generator::{IdentityGenerator, IdentityProfile};
use crate::state::HostSession;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL,
    DNT, PRAGMA, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// What a fetch needs to know about a host's session before sending a request
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub profile: Arc<IdentityProfile>,
    /// Previous successful URL on this host
    pub referrer: Option<String>,
    /// Send `Sec-Fetch-Site: same-origin` instead of `none`
    pub same_origin: bool,
    pub request_count: u32,
}

/// Per-host visitor sessions for one run
///
/// Each host gets its own profile on first contact. The profile is kept for
/// the session TTL and replaced on expiry or explicit rotation.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    generator: Mutex<IdentityGenerator>,
    sessions: Mutex<HashMap<String, HostSession>>,
}

impl SessionStore {
    pub fn new(config: &IdentityConfig) -> Self {
        Self::with_generator(IdentityGenerator::new(config.seed), config.session_ttl())
    }

    pub fn with_generator(generator: IdentityGenerator, ttl: Duration) -> Self {
        Self {
            ttl,
            generator: Mutex::new(generator),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live session state for a host, starting a new session if needed
    pub fn profile_for(&self, host: &str) -> SessionSnapshot {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = sessions
            .get(host)
            .map(|s| s.is_expired(self.ttl, now))
            .unwrap_or(true);

        if expired {
            let profile = Arc::new(self.next_profile());
            tracing::debug!(
                "New session for {} with {} identity",
                host,
                profile.archetype
            );
            sessions.insert(host.to_string(), HostSession::new(host, profile, now));
        }

        let session = &sessions[host];
        SessionSnapshot {
            profile: Arc::clone(&session.profile),
            referrer: session.referrer.clone(),
            same_origin: session.is_same_origin(),
            request_count: session.request_count,
        }
    }

    /// Records a successful request against the host's session
    pub fn commit(&self, host: &str, url: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get_mut(host) {
            session.record_request(url, Instant::now());
        }
    }

    /// Drops the host's session so the next contact draws a fresh identity
    pub fn rotate(&self, host: &str) {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(host);
        if removed.is_some() {
            tracing::info!("Rotated identity for {}", host);
        }
    }

    /// Number of hosts with a session, expired or not
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_profile(&self) -> IdentityProfile {
        self.generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }
}

/// Renders a session snapshot into navigation request headers
pub fn request_headers(snapshot: &SessionSnapshot) -> HeaderMap {
    let profile = &snapshot.profile;
    let mut headers = HeaderMap::new();

    insert(&mut headers, USER_AGENT, &profile.user_agent);
    insert(&mut headers, ACCEPT, &profile.accept);
    insert(&mut headers, ACCEPT_LANGUAGE, &profile.accept_language);
    insert(&mut headers, ACCEPT_ENCODING, &profile.accept_encoding);
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    if let Some(brands) = &profile.platform_hints.brands {
        insert(&mut headers, HeaderName::from_static("sec-ch-ua"), brands);
        let mobile = if profile.platform_hints.mobile { "?1" } else { "?0" };
        headers.insert(
            HeaderName::from_static("sec-ch-ua-mobile"),
            HeaderValue::from_static(mobile),
        );
        insert(
            &mut headers,
            HeaderName::from_static("sec-ch-ua-platform"),
            &format!("\"{}\"", profile.platform_hints.platform),
        );
    }

    if profile.sec_fetch {
        let site = if snapshot.same_origin { "same-origin" } else { "none" };
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static(site),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("navigate"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("document"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-user"),
            HeaderValue::from_static("?1"),
        );
    }

    if let Some(referrer) = &snapshot.referrer {
        insert(&mut headers, REFERER, referrer);
    }
    if profile.send_cache_control {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    }
    if profile.send_pragma {
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }
    if profile.send_dnt {
        headers.insert(DNT, HeaderValue::from_static("1"));
    }

    headers
}

/// Skips values that are not valid header text
fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!("Skipping invalid {} header value", name),
    }
}
