//! Full-browser rendering
//!
//! A fixed pool of remote browser sessions used as the last escalation rung.
//! Sessions are driven over WebDriver through thirtyfour; the `BrowserSession`
//! trait keeps the pool independent of the driver so tests can use fakes.

mod human;
mod pool;
mod webdriver;

pub use human::{bezier_path, plan as plan_human_activity, scroll_steps, HumanPlan};
pub use pool::{BrowserPool, RenderSettings, RenderedPage};
pub use webdriver::{chrome_args, chrome_capabilities, WebDriverSession};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Browser-specific errors
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("Browser pool configuration error: {0}")]
    Config(String),
}

/// A cookie read back from a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// One pooled renderer handle
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Runs a synchronous script and returns its JSON result
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError>;

    /// Moves the pointer through `path`, spending `step` on each segment
    async fn move_pointer(&self, path: &[(i64, i64)], step: Duration) -> Result<(), BrowserError>;

    async fn page_source(&self) -> Result<String, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn cookies(&self) -> Result<Vec<BrowserCookie>, BrowserError>;

    /// Ends the remote session
    async fn close(&self) -> Result<(), BrowserError>;
}
