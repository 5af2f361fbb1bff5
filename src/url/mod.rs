//! URL handling module for Ladder-Crawl
//!
//! This module provides URL canonicalization, authority extraction and the
//! base-domain membership check used by the frontier.

mod domain;
mod normalize;

pub use domain::{
    base_domain, extract_domain, host_key, is_within_domain, redact_credentials, site_root,
};
pub use normalize::normalize_url;
