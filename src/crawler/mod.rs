//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of canonical URLs still to visit
//! - Request pacing per host
//! - The escalating fetch across the retrieval ladder
//! - Link extraction and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod politeness;

pub use coordinator::{run_crawl, Coordinator, CrawlReport, StopHandle};
pub use fetcher::EscalatingFetcher;
pub use frontier::{Frontier, FrontierEntry};
pub use parser::{extract_links, Extractor, LinkExtractor};
pub use politeness::PolitenessClock;
