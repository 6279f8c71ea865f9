// Test doubles for the fetch layer.
//
// - MockHttp (HttpFetch): HashMap-based URL→response with per-URL call counts
//
// No network: connectors run against canned bodies in milliseconds.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::http::HttpFetch;

/// HashMap-based fetcher. Unregistered URLs answer `Status(404)`.
/// Builder pattern: `.on_text()`, `.on_json()`, `.on_error()`, `.flaky()`.
pub struct MockHttp {
    responses: HashMap<String, Result<String>>,
    /// Remaining transient failures before the registered response is served.
    flaky: Mutex<HashMap<String, u32>>,
    calls: Mutex<HashMap<String, u32>>,
    posted: Mutex<Vec<(String, serde_json::Value)>>,
}

impl Default for MockHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHttp {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            flaky: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn on_text(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn on_json(self, url: &str, body: serde_json::Value) -> Self {
        self.on_text(url, &body.to_string())
    }

    pub fn on_error(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    /// Time out `failures` times, then serve `body`.
    pub fn flaky(mut self, url: &str, failures: u32, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self.flaky
            .get_mut()
            .expect("flaky lock")
            .insert(url.to_string(), failures);
        self
    }

    /// Number of requests made to `url` (GET and POST).
    pub fn calls(&self, url: &str) -> u32 {
        self.calls
            .lock()
            .expect("calls lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().expect("calls lock").values().sum()
    }

    /// JSON bodies sent with `post_json`, in order.
    pub fn posted(&self) -> Vec<(String, serde_json::Value)> {
        self.posted.lock().expect("posted lock").clone()
    }

    fn respond(&self, url: &str) -> Result<String> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(url.to_string())
            .or_insert(0) += 1;

        if let Some(remaining) = self.flaky.lock().expect("flaky lock").get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Timeout);
            }
        }

        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

#[async_trait]
impl HttpFetch for MockHttp {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.respond(url)
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String> {
        self.posted
            .lock()
            .expect("posted lock")
            .push((url.to_string(), body.clone()));
        self.respond(url)
    }
}
