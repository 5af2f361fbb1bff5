//! Statistics generation from a finished crawl
//!
//! This module turns a [`CrawlReport`] plus the run's diagnostics (block
//! events and proxy health) into a summary and prints it.

use crate::block::{BlockEvent, BlockEventLog};
use crate::config::Rung;
use crate::crawler::CrawlReport;
use crate::proxy::ProxyHealthReport;
use std::collections::HashMap;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Distinct URLs accepted into the frontier
    pub urls_discovered: u64,

    /// URLs that were dequeued and attempted
    pub urls_attempted: u64,

    /// Pages fetched successfully
    pub pages_fetched: u64,

    /// Successful pages keyed by the rung that produced them
    pub pages_by_render_mode: HashMap<Rung, u64>,

    /// Failed URLs keyed by their displayed reason
    pub failures_by_reason: HashMap<String, u64>,

    /// Total links returned by the extractor
    pub total_links: u64,

    /// Block events ever recorded, including evicted ones
    pub block_events_total: u64,

    /// Retained block events, oldest first
    pub recent_blocks: Vec<BlockEvent>,

    pub proxy_health: Vec<ProxyHealthReport>,

    pub elapsed: Duration,
    pub stopped: bool,
}

impl CrawlStatistics {
    /// Share of attempted URLs that produced a page, in percent
    pub fn success_rate(&self) -> f64 {
        if self.urls_attempted == 0 {
            return 0.0;
        }
        self.pages_fetched as f64 / self.urls_attempted as f64 * 100.0
    }
}

/// Collects statistics from a report and the run's diagnostics
pub fn collect_statistics(
    report: &CrawlReport,
    block_events: &BlockEventLog,
    proxy_health: Vec<ProxyHealthReport>,
) -> CrawlStatistics {
    let mut pages_by_render_mode = HashMap::new();
    let mut failures_by_reason = HashMap::new();
    let mut total_links = 0u64;

    for outcome in &report.outcomes {
        total_links += outcome.links_found as u64;
        match &outcome.result {
            Ok(page) => *pages_by_render_mode.entry(page.render_mode).or_insert(0) += 1,
            Err(reason) => *failures_by_reason.entry(reason.to_string()).or_insert(0) += 1,
        }
    }

    CrawlStatistics {
        urls_discovered: report.urls_discovered as u64,
        urls_attempted: report.outcomes.len() as u64,
        pages_fetched: report.success_count() as u64,
        pages_by_render_mode,
        failures_by_reason,
        total_links,
        block_events_total: block_events.total_recorded(),
        recent_blocks: block_events.recent(),
        proxy_health,
        elapsed: report.elapsed,
        stopped: report.stopped,
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs discovered: {}", stats.urls_discovered);
    println!("  URLs attempted: {}", stats.urls_attempted);
    println!("  Links found: {}", stats.total_links);
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    if stats.stopped {
        println!("  Stopped early: yes");
    }
    println!();

    println!("Pages by Render Mode:");
    let mut modes: Vec<_> = stats.pages_by_render_mode.iter().collect();
    modes.sort_by(|a, b| b.1.cmp(a.1));
    for (rung, count) in modes {
        println!("  {}: {}", rung.as_str(), count);
    }
    println!();

    if !stats.failures_by_reason.is_empty() {
        println!("Failures:");
        let mut failures: Vec<_> = stats.failures_by_reason.iter().collect();
        failures.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (reason, count) in failures {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    if stats.block_events_total > 0 {
        println!(
            "Block Events ({} total, {} retained):",
            stats.block_events_total,
            stats.recent_blocks.len()
        );
        for event in stats.recent_blocks.iter().rev().take(10) {
            println!(
                "  {} {} [{}] {}",
                event.timestamp.format("%H:%M:%S"),
                event.reason,
                event.status_code,
                event.url
            );
        }
        println!();
    }

    if !stats.proxy_health.is_empty() {
        println!("Proxies ({}):", stats.proxy_health.len());
        for proxy in &stats.proxy_health {
            println!(
                "  - {} [{}] {} ({} consecutive failures)",
                proxy.endpoint,
                proxy.region.as_deref().unwrap_or("-"),
                if proxy.healthy { "healthy" } else { "banned" },
                proxy.consecutive_failures
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} URLs fetched)",
        stats.success_rate(),
        stats.pages_fetched,
        stats.urls_attempted
    );
}
