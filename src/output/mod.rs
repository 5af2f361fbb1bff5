//! Output module for crawl summaries
//!
//! This module handles:
//! - Aggregating a finished run into statistics
//! - Printing the statistics summary

pub mod stats;

pub use stats::{collect_statistics, print_statistics, CrawlStatistics};
