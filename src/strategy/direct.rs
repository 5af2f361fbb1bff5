use crate::config::Rung;
use crate::identity::request_headers;
use crate::strategy::{
    AttemptRequest, ClientCache, ClientFlavor, FetchStrategy, RawResponse, TransportError,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use std::sync::Arc;

/// Plain HTTP GET carrying the host's identity
///
/// Sends only the core navigation headers of the profile; client hints and
/// fetch metadata are left to the stealth rung.
#[derive(Debug)]
pub struct DirectStrategy {
    clients: Arc<ClientCache>,
}

impl DirectStrategy {
    pub fn new(clients: Arc<ClientCache>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl FetchStrategy for DirectStrategy {
    fn rung(&self) -> Rung {
        Rung::Direct
    }

    fn uses_proxy(&self) -> bool {
        true
    }

    async fn attempt(&self, request: &AttemptRequest) -> Result<RawResponse, TransportError> {
        let client = self
            .clients
            .client(ClientFlavor::Plain, request.proxy.as_deref())?;

        let response = client
            .get(request.url.clone())
            .headers(plain_headers(&request_headers(&request.session)))
            .timeout(request.timeout)
            .send()
            .await?;

        Ok(RawResponse::read(response).await?)
    }
}

fn plain_headers(full: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [USER_AGENT, ACCEPT, ACCEPT_LANGUAGE, ACCEPT_ENCODING, REFERER] {
        if let Some(value) = full.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityGenerator, SessionStore};
    use reqwest::cookie::Jar;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(url: &str, store: &SessionStore) -> AttemptRequest {
        let url = Url::parse(url).unwrap();
        let host = crate::url::host_key(&url).unwrap();
        AttemptRequest {
            session: store.profile_for(&host),
            url,
            host,
            proxy: None,
            timeout: Duration::from_secs(5),
            crawl_delay: None,
            root_allowed: true,
        }
    }

    #[tokio::test]
    async fn test_direct_sends_identity() {
        let server = MockServer::start().await;
        let store = SessionStore::with_generator(
            IdentityGenerator::new(Some(3)),
            Duration::from_secs(60),
        );
        let request = request(&format!("{}/page", server.uri()), &store);

        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_exists("user-agent"))
            .and(header_exists("accept-language"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>hello</html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let strategy = DirectStrategy::new(Arc::new(ClientCache::new(Arc::new(Jar::default()))));
        let response = strategy.attempt(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.content_type().as_deref(), Some("text/html"));
        assert_eq!(&response.body[..], b"<html>hello</html>");
    }

    #[tokio::test]
    async fn test_direct_omits_client_hints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("sec-fetch-mode"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header_exists("sec-ch-ua"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = SessionStore::with_generator(
            IdentityGenerator::new(Some(5)),
            Duration::from_secs(60),
        );
        let request = request(&format!("{}/", server.uri()), &store);
        let strategy = DirectStrategy::new(Arc::new(ClientCache::new(Arc::new(Jar::default()))));

        let response = strategy.attempt(&request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_direct_passes_error_status_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = SessionStore::with_generator(
            IdentityGenerator::new(Some(5)),
            Duration::from_secs(60),
        );
        let request = request(&format!("{}/", server.uri()), &store);
        let strategy = DirectStrategy::new(Arc::new(ClientCache::new(Arc::new(Jar::default()))));

        let response = strategy.attempt(&request).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_direct_connection_error() {
        let store = SessionStore::with_generator(
            IdentityGenerator::new(Some(5)),
            Duration::from_secs(60),
        );
        let request = request("http://127.0.0.1:1/", &store);
        let strategy = DirectStrategy::new(Arc::new(ClientCache::new(Arc::new(Jar::default()))));

        assert!(matches!(
            strategy.attempt(&request).await,
            Err(TransportError::Http(_))
        ));
    }
}
