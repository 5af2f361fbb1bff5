//! Robots.txt handling module
//!
//! Fetches, parses and caches robots.txt once per host and user agent for the
//! life of a run. Fetch failures and non-200 responses never block a crawl:
//! they are treated as "no restrictions".

mod cache;
mod parser;

pub use cache::{RobotsCache, RobotsVerdict};
pub use parser::ParsedRobots;
