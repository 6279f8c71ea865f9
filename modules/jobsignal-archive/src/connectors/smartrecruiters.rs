use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use jobsignal_common::{DirectoryCompany, JobSource, UnifiedJob};

use super::{encode_segment, fetch_directory, mentions_remote, parse_timestamp, Connector, FetchContext};
use crate::http::{fetch_json_with_retries, HttpFetch, RetryPolicy};

#[derive(Debug, Deserialize)]
struct PostingsPage {
    #[serde(default)]
    content: Vec<SmartRecruitersPosting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmartRecruitersPosting {
    id: Option<String>,
    name: Option<String>,
    location: Option<SmartRecruitersLocation>,
    released_date: Option<String>,
    /// API link to the posting detail; used when no apply URL is given.
    #[serde(rename = "ref")]
    reference: Option<String>,
    apply_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SmartRecruitersLocation {
    city: Option<String>,
    country: Option<String>,
    remote: Option<bool>,
}

impl SmartRecruitersLocation {
    /// "City, Country", or whichever half is present.
    fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

pub struct SmartRecruitersConnector {
    http: Arc<dyn HttpFetch>,
    retry: RetryPolicy,
}

impl SmartRecruitersConnector {
    pub fn new(http: Arc<dyn HttpFetch>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    pub fn postings_url(company_id: &str) -> String {
        format!(
            "https://api.smartrecruiters.com/v1/companies/{}/postings",
            encode_segment(company_id)
        )
    }

    async fn fetch_company(&self, company: &DirectoryCompany, company_id: &str, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let url = Self::postings_url(company_id);
        let Some(page) = fetch_json_with_retries::<PostingsPage>(self.http.as_ref(), &url, &self.retry).await
        else {
            return Vec::new();
        };

        page.content
            .into_iter()
            .filter_map(|posting| {
                let title = posting.name.filter(|t| !t.trim().is_empty())?;
                let apply_url = posting
                    .apply_url
                    .or(posting.reference)
                    .filter(|u| !u.trim().is_empty())?;
                let flagged_remote = posting.location.as_ref().and_then(|l| l.remote).unwrap_or(false);
                let location = posting.location.as_ref().and_then(SmartRecruitersLocation::display);
                let remote = flagged_remote || mentions_remote(&[Some(title.as_str()), location.as_deref()]);
                let id = posting.id.unwrap_or_else(|| apply_url.clone());

                Some(UnifiedJob {
                    location,
                    remote: Some(remote),
                    posted_at: parse_timestamp(posting.released_date.as_deref()),
                    source_name: Some(company.name.clone()),
                    source_url: Some(url.clone()),
                    website_domain: company.website_domain.clone(),
                    ..UnifiedJob::new(JobSource::SmartRecruiters, id, title, &company.name, apply_url, ctx.now)
                })
            })
            .collect()
    }
}

#[async_trait]
impl Connector for SmartRecruitersConnector {
    fn source(&self) -> JobSource {
        JobSource::SmartRecruiters
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let companies = ctx.directory.companies_for(JobSource::SmartRecruiters);
        fetch_directory(JobSource::SmartRecruiters, companies, |company, id| {
            self.fetch_company(company, id, ctx)
        })
        .await
    }
}
