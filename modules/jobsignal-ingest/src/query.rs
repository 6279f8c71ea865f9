// Read-side filtering of a cached snapshot for downstream feeds.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use jobsignal_common::config::MAX_WINDOW_DAYS;
use jobsignal_common::{classify_category, JobCategory, JobsCache, UnifiedJob, VerificationTier};

use crate::verification::classify;

pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;
pub const DEFAULT_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct JobsQuery {
    /// Narrower freshness window than the cache's own. Clamped to
    /// `0..=MAX_WINDOW_DAYS` when applied.
    pub max_age_days: i64,
    /// Only postings explicitly flagged remote.
    pub remote_only: bool,
    /// Case-insensitive substring over title, company, location and description.
    pub text: Option<String>,
    pub location: Option<String>,
    pub min_tier: Option<VerificationTier>,
    pub limit: usize,
}

impl Default for JobsQuery {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            remote_only: false,
            text: None,
            location: None,
            min_tier: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A posting with its derived labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    #[serde(flatten)]
    pub job: UnifiedJob,
    pub tier: VerificationTier,
    pub category: JobCategory,
}

impl JobView {
    pub fn new(job: UnifiedJob) -> Self {
        let tier = classify(&job);
        let category = classify_category(&job.title, &job.company, job.description.as_deref());
        Self { job, tier, category }
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

impl JobsQuery {
    fn matches(&self, job: &UnifiedJob, cutoff: DateTime<Utc>) -> bool {
        if job.reference_time() < cutoff {
            return false;
        }
        if self.remote_only && job.remote != Some(true) {
            return false;
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = contains_ci(Some(&job.title), &needle)
                || contains_ci(Some(&job.company), &needle)
                || contains_ci(job.location.as_deref(), &needle)
                || contains_ci(job.description.as_deref(), &needle);
            if !hit {
                return false;
            }
        }
        if let Some(location) = self.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            if !contains_ci(job.location.as_deref(), &location.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Filter, label and order a snapshot: tier first, then newest, then title.
    pub fn apply(&self, cache: &JobsCache, now: DateTime<Utc>) -> Vec<JobView> {
        let max_age = Duration::days(self.max_age_days.clamp(0, MAX_WINDOW_DAYS));
        let cutoff = now.checked_sub_signed(max_age).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut views: Vec<JobView> = cache
            .jobs
            .iter()
            .filter(|job| self.matches(job, cutoff))
            .map(|job| JobView::new(job.clone()))
            .filter(|view| self.min_tier.is_none_or(|min| view.tier >= min))
            .collect();

        views.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| b.job.reference_time().cmp(&a.job.reference_time()))
                .then_with(|| a.job.title.cmp(&b.job.title))
        });
        views.truncate(self.limit);
        views
    }
}
