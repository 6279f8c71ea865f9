// Source connectors. Each connector knows one source shape and turns it into
// unified postings. None of them return errors: a broken source yields an
// empty list and a log line.

pub(crate) mod ashby;
pub(crate) mod boards;
pub(crate) mod greenhouse;
pub(crate) mod lever;
pub(crate) mod sites;
pub(crate) mod smartrecruiters;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tracing::info;

use jobsignal_common::{CompanyDirectory, DirectoryCompany, JobSource, UnifiedJob};

use crate::http::{HttpFetch, RetryPolicy};

pub use ashby::AshbyConnector;
pub use boards::{BoardApiConnector, BoardApiKind};
pub use greenhouse::GreenhouseConnector;
pub use lever::LeverConnector;
pub use sites::{SiteConfig, SiteConnector, BOARD_SITES};
pub use smartrecruiters::SmartRecruitersConnector;

/// Max concurrent requests per directory-driven connector.
const MAX_CONCURRENT_COMPANIES: usize = 16;

/// Inputs shared by every connector for one run.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub directory: Arc<CompanyDirectory>,
    /// Stamped into `first_seen_at` of every record produced this run.
    pub now: DateTime<Utc>,
}

impl FetchContext {
    pub fn new(directory: CompanyDirectory, now: DateTime<Utc>) -> Self {
        Self {
            directory: Arc::new(directory),
            now,
        }
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn source(&self) -> JobSource;

    /// Fetch postings. Never fails; unreachable or malformed sources yield `[]`.
    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Connectors keyed by source identifier.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<JobSource, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every production connector: the four ATS providers, the broad board
    /// APIs and the board sites.
    pub fn standard(http: Arc<dyn HttpFetch>, ats_retry: RetryPolicy) -> Self {
        let mut registry = Self::new()
            .register(GreenhouseConnector::new(http.clone(), ats_retry))
            .register(LeverConnector::new(http.clone(), ats_retry))
            .register(AshbyConnector::new(http.clone(), ats_retry))
            .register(SmartRecruitersConnector::new(http.clone(), ats_retry))
            .register(BoardApiConnector::new(http.clone(), BoardApiKind::Remotive))
            .register(BoardApiConnector::new(http.clone(), BoardApiKind::Arbeitnow));
        for site in BOARD_SITES {
            registry.insert(Arc::new(SiteConnector::new(http.clone(), site.clone())));
        }
        registry
    }

    pub fn register(mut self, connector: impl Connector + 'static) -> Self {
        self.insert(Arc::new(connector));
        self
    }

    /// Add or replace the connector for its source.
    pub fn insert(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.source(), connector);
    }

    pub fn get(&self, source: JobSource) -> Option<&Arc<dyn Connector>> {
        self.connectors.get(&source)
    }

    pub fn sources(&self) -> impl Iterator<Item = JobSource> + '_ {
        self.connectors.keys().copied()
    }

    pub fn connectors(&self) -> impl Iterator<Item = &Arc<dyn Connector>> {
        self.connectors.values()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Run `fetch_one` for every directory entry with a non-blank handle and
/// flatten the results. A failed company contributes nothing.
pub(crate) async fn fetch_directory<'a, F, Fut>(
    source: JobSource,
    companies: &'a [DirectoryCompany],
    fetch_one: F,
) -> Vec<UnifiedJob>
where
    F: Fn(&'a DirectoryCompany, &'a str) -> Fut,
    Fut: Future<Output = Vec<UnifiedJob>>,
{
    let pending: Vec<Fut> = companies
        .iter()
        .filter_map(|company| company.handle().map(|handle| fetch_one(company, handle)))
        .collect();
    let batches: Vec<Vec<UnifiedJob>> = stream::iter(pending)
    .buffer_unordered(MAX_CONCURRENT_COMPANIES)
    .collect()
    .await;

    let jobs: Vec<UnifiedJob> = batches.into_iter().flatten().collect();
    info!(source = %source, companies = companies.len(), jobs = jobs.len(), "connector: fetched");
    jobs
}

/// Percent-encode a single path segment.
pub(crate) fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// `remote` appears anywhere in the given fields.
pub(crate) fn mentions_remote(fields: &[Option<&str>]) -> bool {
    fields
        .iter()
        .flatten()
        .any(|field| field.to_ascii_lowercase().contains("remote"))
}

/// Short stable id for records whose source has no id of its own.
pub(crate) fn short_hash(source: JobSource, raw: &str) -> String {
    let digest = Sha256::digest(format!("{}:{raw}", source.as_str()).as_bytes());
    digest.iter().take(12).map(|b| format!("{b:02x}")).collect()
}

/// Lenient timestamp parsing for the formats job APIs actually emit:
/// RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM:SS` (UTC) and bare dates.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Epoch milliseconds → UTC.
pub(crate) fn from_epoch_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms?).single()
}

/// Epoch seconds → UTC.
pub(crate) fn from_epoch_secs(secs: Option<i64>) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs?, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_timestamp_shapes_apis_send() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp(Some("2025-03-03T10:00:00Z")), Some(expected));
        assert_eq!(parse_timestamp(Some("2025-03-03T05:00:00-05:00")), Some(expected));
        assert_eq!(parse_timestamp(Some("Mon, 03 Mar 2025 10:00:00 GMT")), Some(expected));
        assert_eq!(parse_timestamp(Some("2025-03-03 10:00:00")), Some(expected));
        assert_eq!(parse_timestamp(Some("2025-03-03T10:00:00.000")), Some(expected));
        assert_eq!(
            parse_timestamp(Some("2025-03-03")),
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp(Some("yesterday")), None);
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn epoch_conversions() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();
        assert_eq!(from_epoch_millis(Some(expected.timestamp_millis())), Some(expected));
        assert_eq!(from_epoch_secs(Some(expected.timestamp())), Some(expected));
    }

    #[test]
    fn remote_detection_is_case_insensitive() {
        assert!(mentions_remote(&[Some("Backend Engineer"), Some("Remote - EU")]));
        assert!(!mentions_remote(&[Some("Backend Engineer"), None]));
    }

    #[test]
    fn short_hash_is_stable_and_source_scoped() {
        let a = short_hash(JobSource::Plexus, "https://x.io/1");
        assert_eq!(a, short_hash(JobSource::Plexus, "https://x.io/1"));
        assert_ne!(a, short_hash(JobSource::Web3Career, "https://x.io/1"));
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn standard_registry_covers_every_source() {
        let http: Arc<dyn HttpFetch> = Arc::new(crate::testing::MockHttp::new());
        let registry = ConnectorRegistry::standard(http, RetryPolicy::none());
        assert_eq!(registry.sources().collect::<Vec<_>>(), JobSource::ALL.to_vec());
    }
}
