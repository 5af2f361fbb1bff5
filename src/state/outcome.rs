/// Per-URL outcomes handed to the extraction collaborator and the caller
///
/// A fetch either yields a [`PageResult`] or a structured [`FailureReason`];
/// raw errors never escape the coordinator.
use crate::block::{BlockEvent, BlockReason};
use crate::config::Rung;
use bytes::Bytes;
use std::fmt;
use url::Url;

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct PageResult {
    /// The canonical URL that was requested
    pub url: Url,

    /// URL after redirects (or as reported by the solver/browser)
    pub final_url: String,

    /// HTTP status of the terminal response
    pub final_status: u16,

    /// Response body bytes
    pub content: Bytes,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Wall-clock time of the successful rung attempt
    pub latency_ms: u64,

    /// Which rung produced the content
    pub render_mode: Rung,

    /// Block seen on an earlier rung that this rung got past
    pub blocked_reason: Option<BlockReason>,
}

impl PageResult {
    /// Returns true if the content looks like HTML
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.to_ascii_lowercase().contains("html"),
            None => true,
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Why a URL produced no page
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// Every enabled rung failed without a block classification
    FetchFailed {
        /// Last transport error or status seen
        detail: String,
    },

    /// The last rung that answered was a block wall
    BotBlocked {
        reason: BlockReason,

        /// The block event that ended the ladder
        event: BlockEvent,

        /// Proxy that carried the blocked request, if any
        proxy: Option<String>,
    },

    /// robots.txt forbids the URL
    RobotsDisallowed,
}

impl FailureReason {
    /// Returns true for policy rejections that were never attempted over the network
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::RobotsDisallowed)
    }

    /// Stable label used for grouping in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "fetch_failed",
            Self::BotBlocked { .. } => "bot_blocked",
            Self::RobotsDisallowed => "robots_disallowed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed { .. } => write!(f, "fetch_failed"),
            Self::BotBlocked { reason, .. } => write!(f, "bot_blocked:{}", reason),
            Self::RobotsDisallowed => write!(f, "robots_disallowed"),
        }
    }
}

/// Result of one logical page fetch
pub type FetchOutcome = Result<PageResult, FailureReason>;

/// One completed frontier entry, in completion order
#[derive(Debug, Clone)]
pub struct UrlOutcome {
    pub url: Url,
    pub depth: u32,
    pub result: FetchOutcome,

    /// Links the extractor returned for this page
    pub links_found: usize,
}
