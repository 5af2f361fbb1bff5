use crate::browser::human;
use crate::browser::webdriver::{chrome_capabilities, WebDriverSession};
use crate::browser::{BrowserCookie, BrowserError, BrowserSession};
use crate::config::BrowserConfig;
use crate::identity::Viewport;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, SemaphorePermit};

/// Reports readiness and the number of loaded resources
const IDLE_PROBE: &str = "return { ready: document.readyState, \
     resources: performance.getEntriesByType('resource').length };";

const SCROLL_SCRIPT: &str = "window.scrollBy(0, arguments[0]);";

/// Window size every pooled session is launched with
const WINDOW: Viewport = Viewport {
    width: 1366,
    height: 768,
};

/// Per-render behavior of the pool
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Upper bound on one whole render, navigation included
    pub navigation_timeout: Duration,
    /// How long the resource count must stay unchanged
    pub idle_window: Duration,
    pub poll_interval: Duration,
    pub simulate_human: bool,
    pub viewport: Viewport,
    /// Seed for pointer and scroll plans; `None` draws from entropy
    pub seed: Option<u64>,
}

impl RenderSettings {
    pub fn from_config(config: &BrowserConfig, seed: Option<u64>) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            idle_window: config.idle_window(),
            poll_interval: Duration::from_millis(100),
            simulate_human: config.simulate_human,
            viewport: WINDOW,
            seed,
        }
    }
}

/// Markup and session state extracted after a render
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
    pub cookies: Vec<BrowserCookie>,
    pub elapsed: Duration,
}

/// Fixed-size pool of browser sessions
///
/// `render` waits for a free slot instead of failing; the slot goes back to
/// the pool when its guard drops, whatever the render outcome.
pub struct BrowserPool {
    idle: Mutex<Vec<Box<dyn BrowserSession>>>,
    permits: Semaphore,
    size: usize,
    settings: RenderSettings,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for BrowserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserPool")
            .field("size", &self.size)
            .field("available", &self.available())
            .field("settings", &self.settings)
            .finish()
    }
}

/// A checked-out session, returned to the pool on drop
struct SlotGuard<'a> {
    pool: &'a BrowserPool,
    session: Option<Box<dyn BrowserSession>>,
    // Released after `drop` has put the session back
    _permit: SemaphorePermit<'a>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(session);
        }
    }
}

impl BrowserPool {
    /// Eagerly opens `pool_size` WebDriver sessions
    ///
    /// # Errors
    ///
    /// Fails if no WebDriver URL is configured or any session cannot be
    /// created; sessions opened before the failure are closed again.
    pub async fn launch(config: &BrowserConfig, seed: Option<u64>) -> Result<Self, BrowserError> {
        let server_url = config
            .webdriver_url
            .as_deref()
            .ok_or_else(|| BrowserError::Config("webdriver-url is not set".to_string()))?;

        let settings = RenderSettings::from_config(config, seed);
        let capabilities = chrome_capabilities(config, settings.viewport)?;

        let mut sessions: Vec<Box<dyn BrowserSession>> = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            match WebDriverSession::connect(
                server_url,
                capabilities.clone(),
                settings.viewport,
                settings.navigation_timeout,
            )
            .await
            {
                Ok(session) => sessions.push(Box::new(session)),
                Err(e) => {
                    for session in &sessions {
                        let _ = session.close().await;
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!("Browser pool ready with {} sessions", sessions.len());
        Ok(Self::from_sessions(sessions, settings))
    }

    /// Builds a pool over already-open sessions
    pub fn from_sessions(sessions: Vec<Box<dyn BrowserSession>>, settings: RenderSettings) -> Self {
        let size = sessions.len();
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            idle: Mutex::new(sessions),
            permits: Semaphore::new(size),
            size,
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Renders a page in the next free browser
    ///
    /// Returns `None` on any failure, including timeout; the caller treats
    /// that as the rung failing.
    pub async fn render(&self, url: &str) -> Option<RenderedPage> {
        let guard = self.checkout().await?;
        let session = guard.session.as_deref()?;

        let limit = self.settings.navigation_timeout;
        let outcome = tokio::time::timeout(limit, self.drive(session, url))
            .await
            .unwrap_or(Err(BrowserError::Timeout(limit)));

        match outcome {
            Ok(page) => {
                tracing::debug!("Rendered {} in {:?}", url, page.elapsed);
                Some(page)
            }
            Err(e) => {
                tracing::warn!("Browser render of {} failed: {}", url, e);
                None
            }
        }
    }

    /// Waits for in-flight renders, then ends every remote session
    pub async fn shutdown(&self) {
        let Ok(_all) = self.permits.acquire_many(self.size as u32).await else {
            return;
        };
        self.permits.close();

        let sessions =
            std::mem::take(&mut *self.idle.lock().unwrap_or_else(PoisonError::into_inner));
        for session in sessions {
            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close browser session: {}", e);
            }
        }
        tracing::info!("Browser pool shut down");
    }

    async fn checkout(&self) -> Option<SlotGuard<'_>> {
        let permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("Browser pool is closed");
                return None;
            }
        };

        let session = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()?;

        Some(SlotGuard {
            pool: self,
            session: Some(session),
            _permit: permit,
        })
    }

    async fn drive(
        &self,
        session: &dyn BrowserSession,
        url: &str,
    ) -> Result<RenderedPage, BrowserError> {
        let started = Instant::now();

        session.navigate(url).await?;
        self.wait_for_idle(session).await?;

        if self.settings.simulate_human {
            let plan = self.next_plan();
            if let Err(e) = simulate(session, &plan).await {
                tracing::debug!("Human simulation on {} skipped: {}", url, e);
            }
        }

        let html = session.page_source().await?;
        let final_url = session
            .current_url()
            .await
            .unwrap_or_else(|_| url.to_string());
        let cookies = match session.cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                tracing::debug!("Could not read cookies for {}: {}", url, e);
                Vec::new()
            }
        };

        Ok(RenderedPage {
            html,
            final_url,
            cookies,
            elapsed: started.elapsed(),
        })
    }

    fn next_plan(&self) -> human::HumanPlan {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        human::plan(self.settings.viewport, &mut *rng)
    }

    /// Returns once the document is complete and the resource count has not
    /// changed for the idle window
    async fn wait_for_idle(&self, session: &dyn BrowserSession) -> Result<(), BrowserError> {
        let mut last_count = None;
        let mut stable_since = Instant::now();

        loop {
            let state = session.execute(IDLE_PROBE, Vec::new()).await?;
            let ready = state["ready"].as_str() == Some("complete");
            let count = state["resources"].as_u64();
            let now = Instant::now();

            if !ready || count != last_count {
                last_count = count;
                stable_since = now;
            } else if now.duration_since(stable_since) >= self.settings.idle_window {
                return Ok(());
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

async fn simulate(
    session: &dyn BrowserSession,
    plan: &human::HumanPlan,
) -> Result<(), BrowserError> {
    session
        .move_pointer(&plan.pointer_path, plan.pointer_step)
        .await?;
    for delta in &plan.scroll_deltas {
        session.execute(SCROLL_SCRIPT, vec![json!(delta)]).await?;
        tokio::time::sleep(plan.scroll_pause).await;
    }
    Ok(())
}
