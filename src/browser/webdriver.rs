//! WebDriver-backed browser sessions
//!
//! Wraps a thirtyfour [`WebDriver`] so any conforming driver (chromedriver,
//! a Selenium grid) can back the pool.

use crate::browser::{BrowserCookie, BrowserError, BrowserSession};
use crate::config::BrowserConfig;
use crate::identity::Viewport;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

/// Arguments passed to Chrome for every pooled session
const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-default-apps",
    "--mute-audio",
    "--no-first-run",
    "--disable-popup-blocking",
    "--disable-blink-features=AutomationControlled",
];

/// Command-line arguments for a Chrome session sized to `viewport`
pub fn chrome_args(config: &BrowserConfig, viewport: Viewport) -> Vec<String> {
    let mut args: Vec<String> = CHROME_ARGS.iter().map(|a| a.to_string()).collect();
    if config.headless {
        args.push("--headless=new".to_string());
    }
    args.push(format!("--window-size={},{}", viewport.width, viewport.height));
    args
}

/// Chrome capabilities with a normal page-load strategy
pub fn chrome_capabilities(
    config: &BrowserConfig,
    viewport: Viewport,
) -> Result<ChromeCapabilities, BrowserError> {
    let mut caps = DesiredCapabilities::chrome();
    caps.set_page_load_strategy(thirtyfour::PageLoadStrategy::Normal)?;
    for arg in chrome_args(config, viewport) {
        caps.add_arg(&arg)?;
    }
    Ok(caps)
}

/// One live remote browser session
pub struct WebDriverSession {
    driver: WebDriver,
}

impl std::fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverSession").finish_non_exhaustive()
    }
}

impl WebDriverSession {
    /// Opens a session on the server at `server_url`
    ///
    /// The window is resized to `viewport` and page-load, script and implicit
    /// timeouts are all set to `timeout`.
    pub async fn connect(
        server_url: &str,
        caps: ChromeCapabilities,
        viewport: Viewport,
        timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let driver = WebDriver::new(server_url, caps).await?;
        let session = Self { driver };

        if let Err(e) = session
            .driver
            .set_window_rect(0, 0, viewport.width, viewport.height)
            .await
        {
            tracing::warn!("Failed to set browser window size: {}", e);
        }

        let timeouts = TimeoutConfiguration::new(Some(timeout), Some(timeout), Some(timeout));
        if let Err(e) = session.driver.update_timeouts(timeouts).await {
            let _ = session.close().await;
            return Err(e.into());
        }

        tracing::debug!("Opened WebDriver session at {}", server_url);
        Ok(session)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        let result = self.driver.execute(script, args).await?;
        Ok(result.json().clone())
    }

    async fn move_pointer(&self, path: &[(i64, i64)], step: Duration) -> Result<(), BrowserError> {
        for &(x, y) in path {
            self.driver.action_chain().move_to(x, y).perform().await?;
            tokio::time::sleep(step).await;
        }
        Ok(())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.driver.source().await?)
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>, BrowserError> {
        let cookies = self.driver.get_all_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        // quit() consumes the handle; clones share the remote session
        self.driver.clone().quit().await?;
        Ok(())
    }
}
