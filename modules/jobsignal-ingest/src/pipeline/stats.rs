use std::collections::HashMap;

use chrono::{DateTime, Utc};

use jobsignal_common::{IngestStats, JobSource, SourceBreakdown, UnifiedJob};

/// Per-run counters keyed by source. Filled as connector results arrive and
/// folded into `IngestStats` once at the end of the run.
#[derive(Debug, Default)]
pub struct SourceTally {
    seen: HashMap<JobSource, u32>,
    kept: HashMap<JobSource, u32>,
}

impl SourceTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source even when it returned nothing, so it shows up in the breakdown.
    pub fn record_seen(&mut self, source: JobSource, count: usize) {
        *self.seen.entry(source).or_default() += count as u32;
    }

    /// Count survivors under the source that supplied their content.
    pub fn record_kept(&mut self, jobs: &[UnifiedJob]) {
        for job in jobs {
            *self.kept.entry(job.source).or_default() += 1;
        }
    }

    pub fn jobs_seen(&self) -> u32 {
        self.seen.values().sum()
    }

    pub fn finish(self, generated_at: DateTime<Utc>, jobs_deduped: u32) -> IngestStats {
        let mut sources: Vec<JobSource> = self.seen.keys().chain(self.kept.keys()).copied().collect();
        sources.sort_by_key(|s| s.as_str());
        sources.dedup();

        let source_breakdown: Vec<SourceBreakdown> = sources
            .into_iter()
            .map(|source| SourceBreakdown {
                source,
                seen: self.seen.get(&source).copied().unwrap_or(0),
                kept: self.kept.get(&source).copied().unwrap_or(0),
            })
            .collect();

        IngestStats {
            generated_at,
            jobs_seen: self.jobs_seen(),
            jobs_kept: self.kept.values().sum(),
            jobs_deduped,
            source_breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_is_sorted_by_identifier_and_includes_empty_sources() {
        let now = Utc::now();
        let mut tally = SourceTally::new();
        tally.record_seen(JobSource::Web3Career, 3);
        tally.record_seen(JobSource::Greenhouse, 2);
        tally.record_seen(JobSource::Arbeitnow, 0);
        tally.record_kept(&[
            UnifiedJob::new(JobSource::Greenhouse, "1", "A", "Acme", "https://a.io/1", now),
            UnifiedJob::new(JobSource::Web3Career, "2", "B", "Acme", "https://a.io/2", now),
        ]);

        let stats = tally.finish(now, 2);
        let sources: Vec<&str> = stats.source_breakdown.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(sources, vec!["ARBEITNOW", "GREENHOUSE", "WEB3_CAREER"]);
        assert_eq!(stats.jobs_seen, 5);
        assert_eq!(stats.jobs_kept, 2);
        assert_eq!(stats.jobs_deduped, 2);
        assert_eq!(stats.source_breakdown[1].seen, 2);
        assert_eq!(stats.source_breakdown[1].kept, 1);
    }
}
