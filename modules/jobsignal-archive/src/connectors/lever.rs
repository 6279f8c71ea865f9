use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use jobsignal_common::{DirectoryCompany, JobSource, UnifiedJob};

use super::{encode_segment, fetch_directory, from_epoch_millis, mentions_remote, Connector, FetchContext};
use crate::http::{fetch_json_with_retries, HttpFetch, RetryPolicy};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    id: Option<String>,
    text: Option<String>,
    categories: Option<LeverCategories>,
    description_plain: Option<String>,
    hosted_url: Option<String>,
    /// Epoch milliseconds.
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LeverCategories {
    location: Option<String>,
}

pub struct LeverConnector {
    http: Arc<dyn HttpFetch>,
    retry: RetryPolicy,
}

impl LeverConnector {
    pub fn new(http: Arc<dyn HttpFetch>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    pub fn postings_url(slug: &str) -> String {
        format!("https://api.lever.co/v0/postings/{}?mode=json", encode_segment(slug))
    }

    async fn fetch_company(&self, company: &DirectoryCompany, slug: &str, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let url = Self::postings_url(slug);
        let Some(postings) =
            fetch_json_with_retries::<Vec<LeverPosting>>(self.http.as_ref(), &url, &self.retry).await
        else {
            return Vec::new();
        };

        postings
            .into_iter()
            .filter_map(|posting| {
                let title = posting.text.filter(|t| !t.trim().is_empty())?;
                let apply_url = posting.hosted_url.filter(|u| !u.trim().is_empty())?;
                let location = posting.categories.and_then(|c| c.location);
                let id = posting.id.unwrap_or_else(|| apply_url.clone());

                Some(UnifiedJob {
                    remote: Some(mentions_remote(&[Some(title.as_str()), location.as_deref()])),
                    location,
                    description: posting.description_plain,
                    posted_at: from_epoch_millis(posting.created_at),
                    source_name: Some(company.name.clone()),
                    source_url: Some(url.clone()),
                    website_domain: company.website_domain.clone(),
                    ..UnifiedJob::new(JobSource::Lever, id, title, &company.name, apply_url, ctx.now)
                })
            })
            .collect()
    }
}

#[async_trait]
impl Connector for LeverConnector {
    fn source(&self) -> JobSource {
        JobSource::Lever
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let companies = ctx.directory.companies_for(JobSource::Lever);
        fetch_directory(JobSource::Lever, companies, |company, slug| {
            self.fetch_company(company, slug, ctx)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHttp;
    use chrono::{TimeZone, Utc};
    use jobsignal_common::CompanyDirectory;
    use serde_json::json;

    #[tokio::test]
    async fn maps_postings_with_epoch_millis() {
        let created = Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
        let http = MockHttp::new().on_json(
            &LeverConnector::postings_url("beta"),
            json!([
                {
                    "id": "abc-123",
                    "text": "Senior Solidity Engineer",
                    "categories": {"location": "Berlin"},
                    "descriptionPlain": "Audit contracts",
                    "hostedUrl": "https://jobs.lever.co/beta/abc-123",
                    "createdAt": created.timestamp_millis()
                },
                {"id": "missing-url", "text": "Designer"}
            ]),
        );
        let connector = LeverConnector::new(Arc::new(http), RetryPolicy::none());
        let ctx = FetchContext::new(
            CompanyDirectory {
                lever_companies: vec![DirectoryCompany::new("Beta", "beta", None)],
                ..Default::default()
            },
            Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(),
        );

        let jobs = connector.fetch(&ctx).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "abc-123");
        assert_eq!(jobs[0].posted_at, Some(created));
        assert_eq!(jobs[0].remote, Some(false));
        assert_eq!(jobs[0].description.as_deref(), Some("Audit contracts"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let url = LeverConnector::postings_url("beta");
        let http = Arc::new(MockHttp::new().flaky(
            &url,
            1,
            r#"[{"id": "1", "text": "Remote Engineer", "hostedUrl": "https://jobs.lever.co/beta/1"}]"#,
        ));
        let connector = LeverConnector::new(
            http.clone(),
            RetryPolicy {
                max_retries: 2,
                base_delay: std::time::Duration::from_millis(1),
            },
        );
        let ctx = FetchContext::new(
            CompanyDirectory {
                lever_companies: vec![DirectoryCompany::new("Beta", "beta", None)],
                ..Default::default()
            },
            Utc::now(),
        );

        let jobs = connector.fetch(&ctx).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].remote, Some(true));
        assert_eq!(http.calls(&url), 2);
    }
}
