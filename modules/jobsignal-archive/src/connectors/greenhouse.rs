use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use jobsignal_common::{DirectoryCompany, JobSource, UnifiedJob};

use super::{encode_segment, fetch_directory, mentions_remote, parse_timestamp, Connector, FetchContext};
use crate::http::{fetch_json_with_retries, HttpFetch, RetryPolicy};

#[derive(Debug, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    id: Option<serde_json::Value>,
    title: Option<String>,
    location: Option<GreenhouseLocation>,
    /// Entity-encoded HTML.
    content: Option<String>,
    absolute_url: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseLocation {
    name: Option<String>,
}

pub struct GreenhouseConnector {
    http: Arc<dyn HttpFetch>,
    retry: RetryPolicy,
}

impl GreenhouseConnector {
    pub fn new(http: Arc<dyn HttpFetch>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    pub fn board_url(token: &str) -> String {
        format!(
            "https://boards-api.greenhouse.io/v1/boards/{}/jobs?content=true",
            encode_segment(token)
        )
    }

    async fn fetch_board(&self, company: &DirectoryCompany, token: &str, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let url = Self::board_url(token);
        let Some(board) = fetch_json_with_retries::<BoardResponse>(self.http.as_ref(), &url, &self.retry).await
        else {
            return Vec::new();
        };

        board
            .jobs
            .into_iter()
            .filter_map(|job| {
                let title = job.title.filter(|t| !t.trim().is_empty())?;
                let apply_url = job.absolute_url.filter(|u| !u.trim().is_empty())?;
                let location = job.location.and_then(|l| l.name);
                let id = job
                    .id
                    .map(|v| v.to_string().trim_matches('"').to_string())
                    .unwrap_or_else(|| apply_url.clone());

                Some(UnifiedJob {
                    remote: Some(mentions_remote(&[Some(title.as_str()), location.as_deref()])),
                    location,
                    description: job.content,
                    posted_at: parse_timestamp(job.updated_at.as_deref()),
                    source_name: Some(company.name.clone()),
                    source_url: Some(url.clone()),
                    website_domain: company.website_domain.clone(),
                    ..UnifiedJob::new(JobSource::Greenhouse, id, title, &company.name, apply_url, ctx.now)
                })
            })
            .collect()
    }
}

#[async_trait]
impl Connector for GreenhouseConnector {
    fn source(&self) -> JobSource {
        JobSource::Greenhouse
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let companies = ctx.directory.companies_for(JobSource::Greenhouse);
        fetch_directory(JobSource::Greenhouse, companies, |company, token| {
            self.fetch_board(company, token, ctx)
        })
        .await
    }
}
