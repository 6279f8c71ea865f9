// Orchestrator for ingest runs.
//
// One `JobsService` per process owns the connector registry, the cache store
// and the in-flight run slot. Clones share all of it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{Duration, Utc};
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use jobsignal_archive::{ConnectorRegistry, FetchContext};
use jobsignal_common::{Config, IngestStats, JobsCache};

use crate::cache_store::CacheStore;
use crate::directory::load_directory;
use crate::pipeline::{run_pipeline, SourceTally};

/// A run that could not finish. Cloned to every caller coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("ingest run aborted: {0}")]
    Aborted(String),
}

/// Result of one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub cache: JobsCache,
    pub stats: IngestStats,
    /// Where the snapshot landed, or `None` when both cache paths were unwritable.
    pub persisted_to: Option<PathBuf>,
}

type SharedRun = Shared<BoxFuture<'static, Result<Arc<IngestOutcome>, IngestError>>>;

struct Inner {
    registry: ConnectorRegistry,
    store: CacheStore,
    directory_path: PathBuf,
    freshness_window: Duration,
    stale_after: Duration,
    in_flight: Mutex<Option<SharedRun>>,
    /// At most one pending revalidation; finished handles are replaced.
    background: StdMutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct JobsService {
    inner: Arc<Inner>,
}

impl JobsService {
    pub fn new(
        registry: ConnectorRegistry,
        store: CacheStore,
        directory_path: impl Into<PathBuf>,
        freshness_window: Duration,
        stale_after: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                store,
                directory_path: directory_path.into(),
                freshness_window,
                stale_after,
                in_flight: Mutex::new(None),
                background: StdMutex::new(None),
            }),
        }
    }

    pub fn from_config(config: &Config, registry: ConnectorRegistry) -> Self {
        Self::new(
            registry,
            CacheStore::from_config(config),
            &config.directory_path,
            config.freshness_window(),
            config.stale_after(),
        )
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// Run the full ingest now. A call made while a run is in progress joins
    /// that run and receives the same result instead of starting another.
    pub async fn refresh(&self) -> Result<Arc<IngestOutcome>, IngestError> {
        let run = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(run) => {
                    debug!("Refresh already in flight, joining it");
                    run.clone()
                }
                None => {
                    let run = self.start_run();
                    *slot = Some(run.clone());
                    run
                }
            }
        };
        run.await
    }

    /// Spawn the run so it completes even if every caller goes away. The task
    /// clears the slot itself, after the slot lock held by `refresh` is released.
    fn start_run(&self) -> SharedRun {
        let service = self.clone();
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(service.run_once()).catch_unwind().await;
            *service.inner.in_flight.lock().await = None;
            match result {
                Ok(outcome) => Ok(Arc::new(outcome)),
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(reason = reason.as_str(), "Ingest run panicked");
                    Err(IngestError::Aborted(reason))
                }
            }
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(IngestError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }

    async fn run_once(&self) -> IngestOutcome {
        let run_id = Uuid::new_v4();
        let inner = &self.inner;

        async move {
            let now = Utc::now();
            info!(connectors = inner.registry.len(), "Ingest run starting");

            let directory = load_directory(&inner.directory_path).await;
            let ctx = FetchContext::new(directory, now);

            let fetches = join_all(inner.registry.connectors().map(|connector| {
                let ctx = &ctx;
                async move {
                    let source = connector.source();
                    let jobs = AssertUnwindSafe(connector.fetch(ctx))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            warn!(
                                source = %source,
                                reason = panic_message(panic.as_ref()).as_str(),
                                "Connector panicked, treating as empty"
                            );
                            Vec::new()
                        });
                    (source, jobs)
                }
            }));
            let (batches, previous) = tokio::join!(fetches, inner.store.read());

            let mut tally = SourceTally::new();
            let mut raw = Vec::new();
            for (source, jobs) in batches {
                info!(source = %source, jobs = jobs.len(), "Connector finished");
                tally.record_seen(source, jobs.len());
                raw.extend(jobs);
            }

            let previous_jobs = previous.map(|cache| cache.jobs).unwrap_or_default();
            let output = run_pipeline(raw, &previous_jobs, inner.freshness_window, now);
            tally.record_kept(&output.jobs);

            let cache = JobsCache {
                generated_at: now,
                jobs: output.jobs,
            };
            let persisted_to = match inner.store.write(&cache).await {
                Ok(path) => Some(path),
                Err(e) => {
                    error!(error = ?e, "Failed to persist jobs cache, result kept in memory only");
                    None
                }
            };

            let stats = tally.finish(now, output.jobs_deduped);
            info!(
                jobs_seen = stats.jobs_seen,
                jobs_kept = stats.jobs_kept,
                jobs_deduped = stats.jobs_deduped,
                "Ingest run complete"
            );

            IngestOutcome {
                cache,
                stats,
                persisted_to,
            }
        }
        .instrument(info_span!("ingest_run", run_id = %run_id))
        .await
    }

    /// The latest snapshot. With no readable snapshot the caller waits for a
    /// full run; a snapshot older than the staleness threshold is returned as
    /// is while a refresh runs in the background.
    pub async fn jobs(&self) -> Result<JobsCache, IngestError> {
        let Some(cache) = self.inner.store.read().await else {
            info!("No cached snapshot, running ingest before serving");
            let outcome = self.refresh().await?;
            return Ok(outcome.cache.clone());
        };

        let age = cache.age(Utc::now());
        if age > self.inner.stale_after {
            info!(age_minutes = age.num_minutes(), "Snapshot is stale, refreshing in background");
            self.spawn_background_refresh();
        }
        Ok(cache)
    }

    fn spawn_background_refresh(&self) {
        let mut slot = self
            .inner
            .background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Background refresh already pending");
            return;
        }
        let service = self.clone();
        *slot = Some(tokio::spawn(async move {
            if let Err(e) = service.refresh().await {
                warn!(error = %e, "Background refresh failed, stale snapshot still served");
            }
        }));
    }

    /// Wait for the background refresh started by `jobs()`, if any. Used by
    /// short-lived processes that would otherwise exit before it lands.
    pub async fn wait_for_background(&self) {
        let handle = self
            .inner
            .background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background refresh task did not complete");
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{job, MockConnector};
    use jobsignal_common::JobSource;

    fn service(dir: &std::path::Path, registry: ConnectorRegistry) -> JobsService {
        JobsService::new(
            registry,
            CacheStore::new(dir.join("jobs.json"), dir.join("fallback.json")),
            dir.join("companies.json"),
            Duration::days(14),
            Duration::hours(6),
        )
    }

    #[tokio::test]
    async fn refresh_persists_and_reports_stats() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ConnectorRegistry::new()
            .register(MockConnector::new(JobSource::Lever).with_jobs(vec![
                job(JobSource::Lever, "Backend Engineer", "https://jobs.lever.co/acme/1"),
                job(JobSource::Lever, "Backend Engineer", "https://jobs.lever.co/acme/1"),
            ]))
            .register(MockConnector::new(JobSource::Remotive));
        let svc = service(dir.path(), registry);

        let outcome = svc.refresh().await.unwrap();
        assert_eq!(outcome.persisted_to.as_deref(), Some(svc.store().primary()));
        assert_eq!(outcome.stats.jobs_seen, 2);
        assert_eq!(outcome.stats.jobs_kept, 1);
        assert_eq!(outcome.stats.jobs_deduped, 1);
        assert_eq!(outcome.stats.source_breakdown.len(), 2);

        let stored = svc.store().read().await.unwrap();
        assert_eq!(stored, outcome.cache);
    }

    #[tokio::test]
    async fn panicking_connector_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ConnectorRegistry::new()
            .register(MockConnector::new(JobSource::Greenhouse).panicking())
            .register(MockConnector::new(JobSource::Lever).with_jobs(vec![job(
                JobSource::Lever,
                "Backend Engineer",
                "https://jobs.lever.co/acme/1",
            )]));
        let svc = service(dir.path(), registry);

        let outcome = svc.refresh().await.unwrap();
        assert_eq!(outcome.cache.jobs.len(), 1);
    }

    #[tokio::test]
    async fn slot_clears_after_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MockConnector::new(JobSource::Lever));
        let mut registry = ConnectorRegistry::new();
        registry.insert(connector.clone());
        let svc = service(dir.path(), registry);

        svc.refresh().await.unwrap();
        svc.refresh().await.unwrap();
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn repeated_stale_reads_keep_one_background_task() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(
            MockConnector::new(JobSource::Lever)
                .with_jobs(vec![job(JobSource::Lever, "Backend Engineer", "https://jobs.lever.co/acme/1")])
                .with_delay(std::time::Duration::from_millis(100)),
        );
        let mut registry = ConnectorRegistry::new();
        registry.insert(connector.clone());
        let svc = service(dir.path(), registry);

        let generated_at = Utc::now() - Duration::hours(7);
        svc.store()
            .write(&JobsCache {
                generated_at,
                jobs: vec![job(JobSource::Lever, "Seeded Engineer", "https://jobs.lever.co/acme/seed")],
            })
            .await
            .unwrap();

        let first = svc.jobs().await.unwrap();
        assert_eq!(first.generated_at, generated_at);
        for _ in 0..49 {
            svc.jobs().await.unwrap();
        }
        assert!(svc.inner.background.lock().unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert_eq!(connector.calls(), 1);
        let finished = svc
            .inner
            .background
            .lock()
            .unwrap()
            .as_ref()
            .is_none_or(JoinHandle::is_finished);
        assert!(finished);

        svc.wait_for_background().await;
        assert!(svc.inner.background.lock().unwrap().is_none());
        assert!(svc.store().read().await.unwrap().generated_at > generated_at);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
