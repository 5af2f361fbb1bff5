//! Ladder-Crawl: an escalating, polite page fetcher
//!
//! This crate fetches the pages of a single-domain crawl while respecting
//! robots.txt and per-host pacing, presenting realistic per-host browser
//! identities, and escalating through progressively more expensive retrieval
//! strategies (plain HTTP, stealth HTTP, challenge solver, full browser) when
//! a site blocks it.

pub mod block;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod identity;
pub mod output;
pub mod proxy;
pub mod robots;
pub mod state;
pub mod strategy;
pub mod url;

use thiserror::Error;

/// Main error type for Ladder-Crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Seed URL rejected by the frontier: {url}")]
    SeedRejected { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Ladder-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, Rung};
pub use crawler::{Coordinator, CrawlReport, Extractor, LinkExtractor};
pub use state::{FailureReason, PageResult, UrlOutcome};
pub use url::{extract_domain, normalize_url};
