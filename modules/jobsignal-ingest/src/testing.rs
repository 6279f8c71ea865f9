// Test doubles for the orchestrator.
//
// - MockConnector (Connector): canned postings, call counter, optional delay
//
// Plus `job()` for building a complete, topical posting in one line.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use jobsignal_archive::{Connector, FetchContext};
use jobsignal_common::{JobSource, UnifiedJob};

/// Connector that serves the same postings on every call. Each record gets
/// `first_seen_at` stamped from the run context, as real connectors do.
pub struct MockConnector {
    source: JobSource,
    jobs: Vec<UnifiedJob>,
    delay: Option<Duration>,
    panics: bool,
    calls: AtomicU32,
}

impl MockConnector {
    pub fn new(source: JobSource) -> Self {
        Self {
            source,
            jobs: Vec::new(),
            delay: None,
            panics: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_jobs(mut self, jobs: Vec<UnifiedJob>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Sleep before answering, to keep a run in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn source(&self) -> JobSource {
        self.source
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("mock connector for {} failed", self.source);
        }
        self.jobs
            .iter()
            .cloned()
            .map(|job| UnifiedJob {
                first_seen_at: ctx.now,
                ..job
            })
            .collect()
    }
}

/// A remote posting at "Acme" with a web3 description, so it passes the
/// topical filter whatever its source.
pub fn job(source: JobSource, title: &str, apply_url: &str) -> UnifiedJob {
    UnifiedJob {
        location: Some("Remote".to_string()),
        remote: Some(true),
        description: Some("Build smart contract tooling for our DeFi protocol.".to_string()),
        ..UnifiedJob::new(source, apply_url, title, "Acme", apply_url, Utc::now())
    }
}
