//! FlareSolverr-compatible challenge solver rung
//!
//! The solver runs a real browser on its side, gets past the challenge and
//! returns the final HTML together with the cookies it earned. Those cookies
//! are written into the shared jar so the HTTP rungs can reuse the clearance.

use crate::browser::BrowserCookie;
use crate::config::Rung;
use crate::strategy::{store_cookies, AttemptRequest, FetchStrategy, RawResponse, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SolveRequest<'a> {
    cmd: &'static str,
    url: &'a str,
    #[serde(rename = "maxTimeout")]
    max_timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<SolveProxy>,
}

#[derive(Debug, Serialize)]
struct SolveProxy {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SolveReply {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    url: String,
    status: u16,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    response: String,
    #[serde(default)]
    cookies: Vec<BrowserCookie>,
}

#[derive(Debug)]
pub struct SolverStrategy {
    http: Client,
    endpoint: String,
    max_timeout_ms: u64,
    jar: Arc<Jar>,
}

impl SolverStrategy {
    pub fn new(endpoint: &str, max_timeout_ms: u64, jar: Arc<Jar>) -> Result<Self, reqwest::Error> {
        // The solver may use its whole budget before answering
        let http = Client::builder()
            .timeout(Duration::from_millis(max_timeout_ms) + Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            max_timeout_ms,
            jar,
        })
    }
}

#[async_trait]
impl FetchStrategy for SolverStrategy {
    fn rung(&self) -> Rung {
        Rung::ChallengeSolver
    }

    fn uses_proxy(&self) -> bool {
        true
    }

    async fn attempt(&self, request: &AttemptRequest) -> Result<RawResponse, TransportError> {
        let body = SolveRequest {
            cmd: "request.get",
            url: request.url.as_str(),
            max_timeout: self.max_timeout_ms,
            proxy: request.proxy.as_ref().map(|p| SolveProxy {
                url: p.endpoint.clone(),
                username: p.username.clone(),
                password: p.password.clone(),
            }),
        };

        let reply: SolveReply = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if reply.status != "ok" {
            return Err(TransportError::Solver(format!(
                "{}: {}",
                reply.status, reply.message
            )));
        }
        let solution = reply
            .solution
            .ok_or_else(|| TransportError::Solver("reply has no solution".to_string()))?;

        store_cookies(&self.jar, &request.url, &solution.cookies);

        Ok(RawResponse {
            status: solution.status,
            final_url: solution.url,
            headers: solution_headers(&solution.headers),
            body: Bytes::from(solution.response),
        })
    }
}

/// Solver headers as a `HeaderMap`; HTML is assumed when no type is given
fn solution_headers(raw: &HashMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in raw {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    }
    headers
}
