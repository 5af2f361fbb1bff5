//! Configuration module for Ladder-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so a file only needs to name what it changes.
//!
//! # Example
//!
//! ```no_run
//! use ladder_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    BlockConfig, BrowserConfig, Config, CrawlerConfig, IdentityConfig, LadderConfig,
    PolitenessConfig, ProxyConfig, ProxyEndpoint, RobotsConfig, RobotsPrecedence,
    RotationStrategy, Rung, SolverConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
