use crate::browser::BrowserPool;
use crate::config::Rung;
use crate::strategy::{store_cookies, AttemptRequest, FetchStrategy, RawResponse, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;

/// Full browser render through the shared pool
///
/// WebDriver does not expose the document's HTTP status, so a completed
/// render is reported as 200 and left to the body checks of the detector.
#[derive(Debug)]
pub struct RenderStrategy {
    pool: Arc<BrowserPool>,
    jar: Arc<Jar>,
}

impl RenderStrategy {
    pub fn new(pool: Arc<BrowserPool>, jar: Arc<Jar>) -> Self {
        Self { pool, jar }
    }
}

#[async_trait]
impl FetchStrategy for RenderStrategy {
    fn rung(&self) -> Rung {
        Rung::Browser
    }

    async fn attempt(&self, request: &AttemptRequest) -> Result<RawResponse, TransportError> {
        let page = self
            .pool
            .render(request.url.as_str())
            .await
            .ok_or(TransportError::RenderFailed)?;

        store_cookies(&self.jar, &request.url, &page.cookies);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

        Ok(RawResponse {
            status: 200,
            final_url: page.final_url,
            headers,
            body: Bytes::from(page.html),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserCookie, BrowserError, BrowserSession, RenderSettings};
    use crate::identity::{IdentityGenerator, SessionStore, Viewport};
    use reqwest::cookie::CookieStore;
    use serde_json::{json, Value};
    use std::time::Duration;
    use url::Url;

    struct StaticSession {
        fail: bool,
    }

    #[async_trait]
    impl BrowserSession for StaticSession {
        async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
            if self.fail {
                return Err(BrowserError::Protocol("net::ERR_FAILED".to_string()));
            }
            Ok(())
        }

        async fn execute(&self, _script: &str, _args: Vec<Value>) -> Result<Value, BrowserError> {
            Ok(json!({ "ready": "complete", "resources": 1 }))
        }

        async fn move_pointer(
            &self,
            _path: &[(i64, i64)],
            _step: Duration,
        ) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn page_source(&self) -> Result<String, BrowserError> {
            Ok("<html>rendered</html>".to_string())
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok("https://example.com/landing".to_string())
        }

        async fn cookies(&self) -> Result<Vec<BrowserCookie>, BrowserError> {
            Ok(vec![BrowserCookie {
                name: "cf_clearance".to_string(),
                value: "ok".to_string(),
                domain: Some("example.com".to_string()),
                path: Some("/".to_string()),
            }])
        }

        async fn close(&self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    fn strategy(fail: bool, jar: Arc<Jar>) -> RenderStrategy {
        let settings = RenderSettings {
            navigation_timeout: Duration::from_secs(5),
            idle_window: Duration::ZERO,
            poll_interval: Duration::from_millis(5),
            simulate_human: false,
            viewport: Viewport {
                width: 1366,
                height: 768,
            },
            seed: Some(1),
        };
        let session: Box<dyn BrowserSession> = Box::new(StaticSession { fail });
        let pool = BrowserPool::from_sessions(vec![session], settings);
        RenderStrategy::new(Arc::new(pool), jar)
    }

    fn request() -> AttemptRequest {
        let store =
            SessionStore::with_generator(IdentityGenerator::new(Some(1)), Duration::from_secs(60));
        let url = Url::parse("https://example.com/").unwrap();
        AttemptRequest {
            session: store.profile_for("example.com"),
            url,
            host: "example.com".to_string(),
            proxy: None,
            timeout: Duration::from_secs(5),
            crawl_delay: None,
            root_allowed: true,
        }
    }

    #[tokio::test]
    async fn test_render_result_and_cookies() {
        let jar = Arc::new(Jar::default());
        let response = strategy(false, Arc::clone(&jar))
            .attempt(&request())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.final_url, "https://example.com/landing");
        assert_eq!(response.content_type().as_deref(), Some("text/html"));
        assert_eq!(&response.body[..], b"<html>rendered</html>");

        let cookies = jar
            .cookies(&Url::parse("https://example.com/next").unwrap())
            .unwrap();
        assert!(cookies.to_str().unwrap().contains("cf_clearance=ok"));
    }

    #[tokio::test]
    async fn test_failed_render_is_transport_error() {
        let result = strategy(true, Arc::new(Jar::default()))
            .attempt(&request())
            .await;
        assert!(matches!(result, Err(TransportError::RenderFailed)));
    }
}
