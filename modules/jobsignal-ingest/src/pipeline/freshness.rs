use chrono::{DateTime, Duration, Utc};

use jobsignal_common::UnifiedJob;

/// Keep records whose reference time is at or after `now - window`. A window
/// reaching past the representable range keeps everything.
pub fn filter_by_freshness(jobs: Vec<UnifiedJob>, window: Duration, now: DateTime<Utc>) -> Vec<UnifiedJob> {
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    jobs.into_iter()
        .filter(|job| job.reference_time() >= cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobsignal_common::JobSource;

    #[test]
    fn boundary_is_inclusive_to_the_millisecond() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        let window = Duration::days(14);
        let at = |posted: DateTime<Utc>, url: &str| UnifiedJob {
            posted_at: Some(posted),
            ..UnifiedJob::new(JobSource::Lever, "x", "Engineer", "Acme", url, now)
        };

        let kept = filter_by_freshness(
            vec![
                at(now - window, "https://acme.io/edge"),
                at(now - window - Duration::milliseconds(1), "https://acme.io/stale"),
                at(now, "https://acme.io/today"),
            ],
            window,
            now,
        );
        let urls: Vec<&str> = kept.iter().map(|j| j.apply_url.as_str()).collect();
        assert_eq!(urls, vec!["https://acme.io/edge", "https://acme.io/today"]);
    }

    #[test]
    fn undated_records_use_first_seen() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        let old = UnifiedJob::new(JobSource::Plexus, "x", "Engineer", "Acme", "https://a.io", now - Duration::days(30));
        assert!(filter_by_freshness(vec![old], Duration::days(14), now).is_empty());
    }

    #[test]
    fn oversized_window_keeps_everything_without_overflow() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        let old = UnifiedJob {
            posted_at: Some(now - Duration::days(3000)),
            ..UnifiedJob::new(JobSource::Lever, "x", "Engineer", "Acme", "https://acme.io/1", now)
        };
        let kept = filter_by_freshness(vec![old], Duration::MAX, now);
        assert_eq!(kept.len(), 1);
    }
}
