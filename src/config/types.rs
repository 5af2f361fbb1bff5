use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Ladder-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub politeness: PolitenessConfig,
    pub identity: IdentityConfig,
    pub robots: RobotsConfig,
    pub proxy: ProxyConfig,
    pub block: BlockConfig,
    pub ladder: LadderConfig,
    pub solver: SolverConfig,
    pub browser: BrowserConfig,
}

/// Crawl scope and global concurrency
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Seed URL; its host fixes the crawl's base domain
    pub seed: Option<String>,

    /// Maximum number of distinct URLs the frontier will ever accept
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Global bound on concurrent fetch attempts
    pub concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_pages: 400,
            max_depth: 5,
            concurrency: 4,
        }
    }
}

/// Request pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    /// Lower bound of the random delay applied before every request (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random delay applied before every request (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Minimum spacing between two requests to the same host (milliseconds)
    #[serde(rename = "per-host-interval-ms")]
    pub per_host_interval_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 1500,
            per_host_interval_ms: 1000,
        }
    }
}

impl PolitenessConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn per_host_interval(&self) -> Duration {
        Duration::from_millis(self.per_host_interval_ms)
    }
}

/// Identity profile generation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Lifetime of a host session before its profile is regenerated (seconds)
    #[serde(rename = "session-ttl-secs")]
    pub session_ttl_secs: u64,

    /// Fixed RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,

    /// Rotate the host's identity after the direct rung is blocked
    #[serde(rename = "rotate-on-block")]
    pub rotate_on_block: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 1800,
            seed: None,
            rotate_on_block: true,
        }
    }
}

impl IdentityConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// How Allow/Disallow lines are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RobotsPrecedence {
    /// The last `Allow`/`Disallow` line whose path matches decides
    #[default]
    LastDirective,
    /// Standard longest-path-prefix matching
    LongestMatch,
}

/// robots.txt handling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotsConfig {
    /// Whether robots.txt is consulted at all
    pub enabled: bool,

    /// Agent token matched against `User-agent:` groups
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    pub precedence: RobotsPrecedence,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: "*".to_string(),
            precedence: RobotsPrecedence::LastDirective,
        }
    }
}

/// Proxy selection strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationStrategy {
    #[default]
    RoundRobin,
    Random,
    /// Sticky host-to-proxy assignment, preferring the configured region
    Affinity,
}

/// One egress proxy
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEndpoint {
    /// Proxy URL, e.g. `http://10.0.0.1:3128` or `socks5://10.0.0.2:1080`
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub region: Option<String>,
}

/// Egress proxy pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub strategy: RotationStrategy,

    /// Consecutive failures after which a proxy is banned
    #[serde(rename = "ban-threshold")]
    pub ban_threshold: u32,

    /// Interval between health-check sweeps (seconds)
    #[serde(rename = "health-check-interval-secs")]
    pub health_check_interval_secs: u64,

    /// Stable endpoint probed through banned proxies
    #[serde(rename = "probe-url")]
    pub probe_url: String,

    /// Region preferred by the affinity strategy
    #[serde(rename = "preferred-region")]
    pub preferred_region: Option<String>,

    pub endpoints: Vec<ProxyEndpoint>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::RoundRobin,
            ban_threshold: 3,
            health_check_interval_secs: 60,
            probe_url: "https://www.gstatic.com/generate_204".to_string(),
            preferred_region: None,
            endpoints: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Block-wall classification
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Status codes that always mean "blocked"
    pub statuses: Vec<u16>,

    /// Lowercase phrases that mark a challenge page
    pub phrases: Vec<String>,

    /// How many leading body bytes are scanned for phrases
    #[serde(rename = "sample-bytes")]
    pub sample_bytes: usize,

    /// Capacity of the block-event ring buffer
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            statuses: vec![403, 409, 423, 429, 503],
            phrases: [
                "are you a robot",
                "captcha",
                "unusual traffic",
                "verify you are human",
                "checking your browser",
                "access denied",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            sample_bytes: 4096,
            event_capacity: 100,
        }
    }
}

/// Retrieval strategies, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rung {
    Direct,
    Stealth,
    ChallengeSolver,
    Browser,
}

impl Rung {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Stealth => "stealth",
            Self::ChallengeSolver => "challenge-solver",
            Self::Browser => "browser",
        }
    }
}

/// Escalation ladder
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    /// Enabled rungs; order in the ladder is always direct, stealth, solver, browser
    pub rungs: Vec<Rung>,

    /// Backoff delays between transport retries on one rung (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: Vec<u64>,

    /// Per-request timeout for the HTTP rungs (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            rungs: vec![Rung::Direct, Rung::Stealth],
            retry_backoff_ms: vec![2_000, 8_000, 30_000],
            request_timeout_secs: 30,
        }
    }
}

impl LadderConfig {
    pub fn is_enabled(&self, rung: Rung) -> bool {
        self.rungs.contains(&rung)
    }

    pub fn retry_backoff(&self) -> Vec<Duration> {
        self.retry_backoff_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// External challenge-solving service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver API endpoint, e.g. `http://localhost:8191/v1`
    pub endpoint: Option<String>,

    /// Time the solver may spend on one challenge (milliseconds)
    #[serde(rename = "max-timeout-ms")]
    pub max_timeout_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_timeout_ms: 60_000,
        }
    }
}

/// Full-browser render pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint, e.g. `http://localhost:4444`
    #[serde(rename = "webdriver-url")]
    pub webdriver_url: Option<String>,

    /// Number of browser sessions created at startup
    #[serde(rename = "pool-size")]
    pub pool_size: usize,

    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Quiet period with no new network resources before the DOM is read
    #[serde(rename = "idle-ms")]
    pub idle_ms: u64,

    /// Scroll and move the pointer before extracting the DOM
    #[serde(rename = "simulate-human")]
    pub simulate_human: bool,

    /// Run the browser without a visible window
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            pool_size: 2,
            navigation_timeout_ms: 30_000,
            idle_ms: 500,
            simulate_human: true,
            headless: true,
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}
