// Fetch utility: timeout-bounded GET/POST behind a trait, plus fail-soft
// helpers that turn every failure into `None`.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};

// ---------------------------------------------------------------------------
// HttpFetch: the one seam connectors talk to the network through
// ---------------------------------------------------------------------------

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `url` and return the body of a 2xx response.
    async fn get_text(&self, url: &str) -> Result<String>;

    /// POST a JSON body to `url` and return the body of a 2xx response.
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String>;
}

/// reqwest-backed fetcher. The client-wide timeout covers connect, headers and body.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        info!(timeout_ms = timeout.as_millis() as u64, user_agent, "HttpClient initialized");
        Ok(Self { client })
    }

    async fn read(resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.text().await.map_err(FetchError::from_reqwest)
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        Self::read(resp).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        Self::read(resp).await
    }
}

// ---------------------------------------------------------------------------
// Retry policy (authoritative sources only)
// ---------------------------------------------------------------------------

/// Bounded exponential backoff: `base_delay * 2^attempt` plus up to half of
/// `base_delay` of jitter. Only transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(attempt);
        let jitter_ms = self.base_delay.as_millis() as u64 / 2;
        if jitter_ms == 0 {
            return exp;
        }
        exp + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fail-soft helpers
// ---------------------------------------------------------------------------

/// GET `url` as text. Any failure is logged at debug and becomes `None`.
pub async fn fetch_text(http: &dyn HttpFetch, url: &str) -> Option<String> {
    match http.get_text(url).await {
        Ok(body) => Some(body),
        Err(e) => {
            debug!(url, error = %e, "fetch: no content");
            None
        }
    }
}

/// GET `url` and decode JSON. Failures (including decode errors) become `None`.
pub async fn fetch_json<T: DeserializeOwned>(http: &dyn HttpFetch, url: &str) -> Option<T> {
    fetch_json_with_retries(http, url, &RetryPolicy::none()).await
}

/// GET `url` and decode JSON, retrying transient failures per `policy`.
pub async fn fetch_json_with_retries<T: DeserializeOwned>(
    http: &dyn HttpFetch,
    url: &str,
    policy: &RetryPolicy,
) -> Option<T> {
    let body = policy.run(url, || http.get_text(url)).await;
    decode_soft(url, body)
}

/// POST a JSON body and decode the JSON reply, retrying transient failures.
pub async fn post_json_with_retries<T: DeserializeOwned>(
    http: &dyn HttpFetch,
    url: &str,
    body: &serde_json::Value,
    policy: &RetryPolicy,
) -> Option<T> {
    let reply = policy.run(url, || http.post_json(url, body)).await;
    decode_soft(url, reply)
}

fn decode_soft<T: DeserializeOwned>(url: &str, body: Result<String>) -> Option<T> {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(url, error = %e, "fetch failed");
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(url, error = %e, "fetch: malformed JSON payload");
            None
        }
    }
}
