//! Ladder-Crawl main entry point
//!
//! This is the command-line interface for the Ladder-Crawl page fetcher.

use anyhow::{bail, Context};
use clap::Parser;
use ladder_crawl::config::{load_config_with_hash, validate, Config, Rung};
use ladder_crawl::crawler::{Coordinator, LinkExtractor};
use ladder_crawl::output::{collect_statistics, print_statistics};
use ladder_crawl::proxy::Proxy;
use ladder_crawl::url::redact_credentials;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ladder-Crawl: an escalating, polite page fetcher
///
/// Ladder-Crawl crawls a single domain while respecting robots.txt and
/// per-host pacing. When a site blocks it, it escalates from plain HTTP to
/// stealth HTTP, a challenge solver and finally a full browser.
#[derive(Parser, Debug)]
#[command(name = "ladder-crawl")]
#[command(version = "1.0.0")]
#[command(about = "An escalating, polite page fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL, overriding crawler.seed from the config
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(seed) = cli.seed {
        config.crawler.seed = Some(seed);
    }
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ladder_crawl=info,warn"),
            1 => EnvFilter::new("ladder_crawl=debug,info"),
            2 => EnvFilter::new("ladder_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    print!("{}", dry_run_report(config)?);
    Ok(())
}

/// Renders the dry-run summary; endpoint credentials are redacted
fn dry_run_report(config: &Config) -> anyhow::Result<String> {
    let Some(seed) = config.crawler.seed.as_deref() else {
        bail!("no seed URL: set crawler.seed or pass --seed");
    };

    let mut out = String::new();
    writeln!(out, "=== Ladder-Crawl Dry Run ===\n")?;

    writeln!(out, "Crawler:")?;
    writeln!(out, "  Seed: {}", seed)?;
    writeln!(out, "  Max pages: {}", config.crawler.max_pages)?;
    writeln!(out, "  Max depth: {}", config.crawler.max_depth)?;
    writeln!(out, "  Concurrency: {}", config.crawler.concurrency)?;

    writeln!(out, "\nPoliteness:")?;
    writeln!(
        out,
        "  Jitter: {}-{}ms",
        config.politeness.min_delay_ms, config.politeness.max_delay_ms
    )?;
    writeln!(
        out,
        "  Per-host interval: {}ms",
        config.politeness.per_host_interval_ms
    )?;
    writeln!(
        out,
        "  robots.txt: {}",
        if config.robots.enabled {
            "respected"
        } else {
            "ignored"
        }
    )?;

    writeln!(out, "\nLadder:")?;
    for rung in &config.ladder.rungs {
        let detail = match rung {
            Rung::ChallengeSolver => config.solver.endpoint.as_deref(),
            Rung::Browser => config.browser.webdriver_url.as_deref(),
            Rung::Direct | Rung::Stealth => None,
        };
        match detail {
            Some(endpoint) => writeln!(
                out,
                "  - {} ({})",
                rung.as_str(),
                redact_credentials(endpoint)
            )?,
            None => writeln!(out, "  - {}", rung.as_str())?,
        }
    }
    writeln!(out, "  Retry backoff: {:?}ms", config.ladder.retry_backoff_ms)?;

    writeln!(out, "\nProxies ({}):", config.proxy.endpoints.len())?;
    for endpoint in &config.proxy.endpoints {
        writeln!(
            out,
            "  - {} [{}]",
            Proxy::new(endpoint).label(),
            endpoint.region.as_deref().unwrap_or("-")
        )?;
    }

    writeln!(out, "\n✓ Configuration is valid")?;
    Ok(out)
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::new(config, Arc::new(LinkExtractor))
        .await
        .context("failed to start crawl")?;

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let report = coordinator.run().await;
    coordinator.shutdown().await;

    let stats = collect_statistics(
        &report,
        &coordinator.block_events(),
        coordinator.proxy_health(),
    );
    print_statistics(&stats);

    Ok(())
}
