pub mod dedup;
pub mod freshness;
pub mod normalize;
pub mod stats;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use jobsignal_common::UnifiedJob;

pub use dedup::{collapse_cross_source, dedupe_hash, dedupe_jobs, job_hash, merge_first_seen, sort_jobs};
pub use freshness::filter_by_freshness;
pub use normalize::{normalize_and_filter, normalize_job};
pub use stats::SourceTally;

/// Result of one pass over a raw batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub jobs: Vec<UnifiedJob>,
    /// Records removed by hash dedupe and cross-source collapse together.
    pub jobs_deduped: u32,
}

/// The ingest pipeline. Stage order matters: first-seen carry-forward runs
/// before the freshness filter so carried timestamps are what get judged.
pub fn run_pipeline(
    raw: Vec<UnifiedJob>,
    previous: &[UnifiedJob],
    window: Duration,
    now: DateTime<Utc>,
) -> PipelineOutput {
    let raw_count = raw.len();
    let normalized = normalize_and_filter(raw);
    let normalized_count = normalized.len();

    let carried = merge_first_seen(previous, normalized);
    let fresh = filter_by_freshness(carried, window, now);
    let fresh_count = fresh.len();

    let deduped = dedupe_jobs(fresh);
    let mut jobs = collapse_cross_source(deduped);
    sort_jobs(&mut jobs);

    debug!(
        raw = raw_count,
        normalized = normalized_count,
        fresh = fresh_count,
        kept = jobs.len(),
        "pipeline: batch processed"
    );

    PipelineOutput {
        jobs_deduped: (fresh_count - jobs.len()) as u32,
        jobs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobsignal_common::JobSource;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn carried_first_seen_can_age_a_record_out() {
        // Undated posting first seen 20 days ago: fresh by this run's stamp,
        // stale once its real discovery time is carried forward.
        let url = "https://acme.io/jobs/1";
        let previous = vec![UnifiedJob::new(
            JobSource::Plexus,
            "old",
            "Engineer",
            "Acme",
            url,
            now() - Duration::days(20),
        )];
        let raw = vec![UnifiedJob::new(JobSource::Plexus, "new", "Engineer", "Acme", url, now())];

        let out = run_pipeline(raw, &previous, Duration::days(14), now());
        assert!(out.jobs.is_empty());
    }

    #[test]
    fn counts_both_dedupe_stages() {
        let url = "https://acme.io/jobs/1";
        let raw = vec![
            UnifiedJob::new(JobSource::Greenhouse, "a", "Engineer", "Acme", "https://boards.greenhouse.io/acme/1", now()),
            UnifiedJob::new(JobSource::Greenhouse, "b", "Engineer", "Acme", "https://boards.greenhouse.io/acme/1", now()),
            UnifiedJob::new(JobSource::CryptoJobsList, "c", "Engineer", "Acme", url, now()),
            UnifiedJob::new(JobSource::CryptoJobsList, "d", "", "Acme", url, now()),
        ];

        let out = run_pipeline(raw, &[], Duration::days(14), now());
        assert_eq!(out.jobs.len(), 1);
        assert_eq!(out.jobs_deduped, 2);
    }
}
