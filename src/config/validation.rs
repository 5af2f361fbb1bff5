use crate::config::types::{
    BlockConfig, BrowserConfig, Config, CrawlerConfig, LadderConfig, PolitenessConfig,
    ProxyConfig, Rung, SolverConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_politeness_config(&config.politeness)?;
    validate_proxy_config(&config.proxy)?;
    validate_block_config(&config.block)?;
    validate_ladder_config(&config.ladder)?;
    if config.ladder.is_enabled(Rung::ChallengeSolver) {
        validate_solver_config(&config.solver)?;
    }
    if config.ladder.is_enabled(Rung::Browser) {
        validate_browser_config(&config.browser)?;
    }
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 256, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if let Some(seed) = &config.seed {
        validate_http_url(seed, "seed")?;
    }

    Ok(())
}

fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }
    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.ban_threshold < 1 {
        return Err(ConfigError::Validation(
            "ban_threshold must be >= 1".to_string(),
        ));
    }

    if config.health_check_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "health_check_interval_secs must be >= 1".to_string(),
        ));
    }

    if !config.endpoints.is_empty() {
        validate_http_url(&config.probe_url, "probe_url")?;
    }

    for endpoint in &config.endpoints {
        let url = Url::parse(&endpoint.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", endpoint.url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::Validation(format!(
                "Proxy URL '{}' must use http, https, socks5 or socks5h",
                endpoint.url
            )));
        }

        if endpoint.username.is_some() != endpoint.password.is_some() {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' needs both username and password, or neither",
                endpoint.url
            )));
        }
    }

    Ok(())
}

fn validate_block_config(config: &BlockConfig) -> Result<(), ConfigError> {
    if let Some(status) = config.statuses.iter().find(|s| !(100..=599).contains(*s)) {
        return Err(ConfigError::Validation(format!(
            "block status {} is not a valid HTTP status code",
            status
        )));
    }

    if config.phrases.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "block phrases cannot be empty".to_string(),
        ));
    }

    if config.sample_bytes < 1 || config.event_capacity < 1 {
        return Err(ConfigError::Validation(
            "sample_bytes and event_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_ladder_config(config: &LadderConfig) -> Result<(), ConfigError> {
    if config.rungs.is_empty() {
        return Err(ConfigError::Validation(
            "at least one ladder rung must be enabled".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_solver_config(config: &SolverConfig) -> Result<(), ConfigError> {
    match &config.endpoint {
        Some(endpoint) => validate_http_url(endpoint, "solver endpoint"),
        None => Err(ConfigError::Validation(
            "challenge-solver rung is enabled but solver.endpoint is not set".to_string(),
        )),
    }
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > 32 {
        return Err(ConfigError::Validation(format!(
            "browser pool_size must be between 1 and 32, got {}",
            config.pool_size
        )));
    }

    match &config.webdriver_url {
        Some(endpoint) => validate_http_url(endpoint, "webdriver_url"),
        None => Err(ConfigError::Validation(
            "browser rung is enabled but browser.webdriver-url is not set".to_string(),
        )),
    }
}

/// Checks that a configured URL parses and uses HTTP(S)
fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyEndpoint;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_inverted_delay_bounds_rejected() {
        let mut config = Config::default();
        config.politeness.min_delay_ms = 2000;
        config.politeness.max_delay_ms = 1000;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_solver_rung_requires_endpoint() {
        let mut config = Config::default();
        config.ladder.rungs.push(Rung::ChallengeSolver);
        assert!(validate(&config).is_err());

        config.solver.endpoint = Some("http://localhost:8191/v1".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_browser_rung_requires_webdriver() {
        let mut config = Config::default();
        config.ladder.rungs.push(Rung::Browser);
        assert!(validate(&config).is_err());

        config.browser.webdriver_url = Some("http://localhost:4444".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_proxy_scheme_checked() {
        let mut config = Config::default();
        config.proxy.endpoints.push(ProxyEndpoint {
            url: "ftp://10.0.0.1:21".to_string(),
            username: None,
            password: None,
            region: None,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_proxy_half_credentials_rejected() {
        let mut config = Config::default();
        config.proxy.endpoints.push(ProxyEndpoint {
            url: "http://10.0.0.1:3128".to_string(),
            username: Some("user".to_string()),
            password: None,
            region: None,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_block_status() {
        let mut config = Config::default();
        config.block.statuses.push(999);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_ladder_rejected() {
        let mut config = Config::default();
        config.ladder.rungs.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_seed_must_be_http() {
        let mut config = Config::default();
        config.crawler.seed = Some("ftp://example.com/".to_string());
        assert!(validate(&config).is_err());
    }
}
