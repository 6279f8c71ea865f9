// Generic remote-job board APIs. These are broad, mostly off-topic feeds; the
// ingest normalizer applies the topical filter to everything they return.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use jobsignal_common::{JobSource, UnifiedJob};

use super::{from_epoch_secs, parse_timestamp, short_hash, Connector, FetchContext};
use crate::http::{fetch_json, HttpFetch};

pub const REMOTIVE_URL: &str = "https://remotive.com/api/remote-jobs";
pub const ARBEITNOW_URL: &str = "https://www.arbeitnow.com/api/job-board-api";

const UNKNOWN_COMPANY: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardApiKind {
    Remotive,
    Arbeitnow,
}

impl BoardApiKind {
    pub fn source(&self) -> JobSource {
        match self {
            BoardApiKind::Remotive => JobSource::Remotive,
            BoardApiKind::Arbeitnow => JobSource::Arbeitnow,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BoardApiKind::Remotive => "Remotive",
            BoardApiKind::Arbeitnow => "Arbeitnow",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            BoardApiKind::Remotive => REMOTIVE_URL,
            BoardApiKind::Arbeitnow => ARBEITNOW_URL,
        }
    }
}

/// Either an RFC 3339-ish string or epoch seconds; boards disagree.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BoardTimestamp {
    Epoch(i64),
    Text(String),
}

impl BoardTimestamp {
    fn resolve(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            BoardTimestamp::Epoch(secs) => from_epoch_secs(Some(*secs)),
            BoardTimestamp::Text(raw) => parse_timestamp(Some(raw.as_str())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemotivePayload {
    #[serde(default)]
    jobs: Vec<RemotiveJob>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    id: Option<i64>,
    title: Option<String>,
    company_name: Option<String>,
    candidate_required_location: Option<String>,
    description: Option<String>,
    url: Option<String>,
    publication_date: Option<BoardTimestamp>,
}

#[derive(Debug, Deserialize)]
struct ArbeitnowPayload {
    #[serde(default)]
    data: Vec<ArbeitnowJob>,
}

#[derive(Debug, Deserialize)]
struct ArbeitnowJob {
    slug: Option<String>,
    title: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
    description: Option<String>,
    remote: Option<bool>,
    url: Option<String>,
    created_at: Option<BoardTimestamp>,
}

/// One JSON board API, selected by `kind`.
pub struct BoardApiConnector {
    http: Arc<dyn HttpFetch>,
    kind: BoardApiKind,
}

impl BoardApiConnector {
    pub fn new(http: Arc<dyn HttpFetch>, kind: BoardApiKind) -> Self {
        Self { http, kind }
    }

    fn base_job(&self, id: Option<String>, title: String, company: String, apply_url: String, ctx: &FetchContext) -> UnifiedJob {
        let source = self.kind.source();
        let id = id.unwrap_or_else(|| short_hash(source, &apply_url));
        UnifiedJob {
            source_name: Some(self.kind.display_name().to_string()),
            source_url: Some(self.kind.url().to_string()),
            ..UnifiedJob::new(source, id, title, company, apply_url, ctx.now)
        }
    }

    async fn fetch_remotive(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let Some(payload) = fetch_json::<RemotivePayload>(self.http.as_ref(), REMOTIVE_URL).await else {
            return Vec::new();
        };
        payload
            .jobs
            .into_iter()
            .filter_map(|job| {
                let apply_url = job.url?;
                let base = self.base_job(
                    job.id.map(|id| id.to_string()),
                    job.title.unwrap_or_default(),
                    job.company_name.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
                    apply_url,
                    ctx,
                );
                Some(UnifiedJob {
                    location: job.candidate_required_location,
                    remote: Some(true),
                    description: job.description,
                    posted_at: job.publication_date.as_ref().and_then(BoardTimestamp::resolve),
                    ..base
                })
            })
            .collect()
    }

    async fn fetch_arbeitnow(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let Some(payload) = fetch_json::<ArbeitnowPayload>(self.http.as_ref(), ARBEITNOW_URL).await else {
            return Vec::new();
        };
        payload
            .data
            .into_iter()
            .filter_map(|job| {
                let apply_url = job.url?;
                let base = self.base_job(
                    job.slug,
                    job.title.unwrap_or_default(),
                    job.company_name.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
                    apply_url,
                    ctx,
                );
                Some(UnifiedJob {
                    location: job.location,
                    remote: job.remote,
                    description: job.description,
                    posted_at: job.created_at.as_ref().and_then(BoardTimestamp::resolve),
                    ..base
                })
            })
            .collect()
    }
}

#[async_trait]
impl Connector for BoardApiConnector {
    fn source(&self) -> JobSource {
        self.kind.source()
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let jobs = match self.kind {
            BoardApiKind::Remotive => self.fetch_remotive(ctx).await,
            BoardApiKind::Arbeitnow => self.fetch_arbeitnow(ctx).await,
        };
        info!(source = %self.kind.source(), jobs = jobs.len(), "connector: fetched");
        jobs
    }
}
