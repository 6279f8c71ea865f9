use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use jobsignal_common::{DirectoryCompany, JobSource, UnifiedJob};

use super::{fetch_directory, mentions_remote, parse_timestamp, Connector, FetchContext};
use crate::http::{post_json_with_retries, HttpFetch, RetryPolicy};

pub const ASHBY_GRAPHQL_URL: &str = "https://jobs.ashbyhq.com/api/non-user-graphql?op=ApiJobBoardWithTeams";

const JOB_BOARD_QUERY: &str = "query ApiJobBoardWithTeams($organizationHostedJobsPageName: String!) { \
    jobBoardWithTeams(organizationHostedJobsPageName: $organizationHostedJobsPageName) { \
    jobPostings { id title locationId locationName isRemote descriptionHtml applyUrl publishedDate } } }";

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlData {
    job_board_with_teams: Option<JobBoard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobBoard {
    #[serde(default)]
    job_postings: Vec<AshbyPosting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyPosting {
    id: Option<String>,
    title: Option<String>,
    location_name: Option<String>,
    is_remote: Option<bool>,
    description_html: Option<String>,
    apply_url: Option<String>,
    published_date: Option<String>,
}

pub struct AshbyConnector {
    http: Arc<dyn HttpFetch>,
    retry: RetryPolicy,
}

impl AshbyConnector {
    pub fn new(http: Arc<dyn HttpFetch>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    async fn fetch_org(&self, company: &DirectoryCompany, org: &str, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let body = json!({
            "operationName": "ApiJobBoardWithTeams",
            "query": JOB_BOARD_QUERY,
            "variables": { "organizationHostedJobsPageName": org },
        });
        let Some(response) =
            post_json_with_retries::<GraphqlResponse>(self.http.as_ref(), ASHBY_GRAPHQL_URL, &body, &self.retry)
                .await
        else {
            return Vec::new();
        };
        let postings = response
            .data
            .and_then(|d| d.job_board_with_teams)
            .map(|b| b.job_postings)
            .unwrap_or_default();
        let board_url = format!("https://jobs.ashbyhq.com/{org}");

        postings
            .into_iter()
            .filter_map(|posting| {
                let title = posting.title.filter(|t| !t.trim().is_empty())?;
                let apply_url = posting.apply_url.filter(|u| !u.trim().is_empty())?;
                let location = posting.location_name;
                let remote = posting.is_remote.unwrap_or(false)
                    || mentions_remote(&[Some(title.as_str()), location.as_deref()]);
                let id = posting.id.unwrap_or_else(|| apply_url.clone());

                Some(UnifiedJob {
                    location,
                    remote: Some(remote),
                    description: posting.description_html,
                    posted_at: parse_timestamp(posting.published_date.as_deref()),
                    source_name: Some(company.name.clone()),
                    source_url: Some(board_url.clone()),
                    website_domain: company.website_domain.clone(),
                    ..UnifiedJob::new(JobSource::Ashby, id, title, &company.name, apply_url, ctx.now)
                })
            })
            .collect()
    }
}

#[async_trait]
impl Connector for AshbyConnector {
    fn source(&self) -> JobSource {
        JobSource::Ashby
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let companies = ctx.directory.companies_for(JobSource::Ashby);
        fetch_directory(JobSource::Ashby, companies, |company, org| self.fetch_org(company, org, ctx)).await
    }
}
