use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ladder_crawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the `host[:port]` authority of a URL
///
/// Pacing, robots.txt and identity sessions are all keyed by authority so that
/// two services on the same host but different ports are treated separately.
pub fn host_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Drops any `user:password@` part of a URL for display
///
/// Strings that do not parse as URLs are returned unchanged.
pub fn redact_credentials(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// The `/` page of the URL's origin
pub fn site_root(url: &Url) -> Url {
    let mut root = url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
}

/// Derives the crawl's base domain from a seed host
///
/// A leading `www.` is dropped so that both the apex and the `www.` host
/// belong to the crawl.
pub fn base_domain(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

/// Checks whether `candidate` is the base domain or one of its subdomains
///
/// # Examples
///
/// ```
/// use ladder_crawl::url::is_within_domain;
///
/// assert!(is_within_domain("example.com", "example.com"));
/// assert!(is_within_domain("example.com", "blog.example.com"));
/// assert!(!is_within_domain("example.com", "notexample.com"));
/// ```
pub fn is_within_domain(base: &str, candidate: &str) -> bool {
    if base.is_empty() {
        return false;
    }
    candidate == base
        || candidate
            .strip_suffix(base)
            .map_or(false, |prefix| prefix.ends_with('.'))
}
