use jobsignal_common::text::{is_valid_http_url, normalize_text, strip_html};
use jobsignal_common::{has_topical_signal, UnifiedJob};

/// Clean one raw record. Returns `None` when title, company or a valid
/// absolute http(s) apply URL is missing after cleanup.
pub fn normalize_job(job: UnifiedJob) -> Option<UnifiedJob> {
    let title = normalize_text(Some(&job.title))?;
    let company = normalize_text(Some(&job.company))?;
    let apply_url = normalize_text(Some(&job.apply_url)).filter(|url| is_valid_http_url(url))?;

    Some(UnifiedJob {
        title,
        company,
        apply_url,
        location: normalize_text(job.location.as_deref()),
        description: strip_html(job.description.as_deref()),
        source_name: normalize_text(job.source_name.as_deref()),
        website_domain: normalize_text(job.website_domain.as_deref()),
        ..job
    })
}

/// Normalize the combined batch and drop off-topic records from broad boards.
pub fn normalize_and_filter(jobs: Vec<UnifiedJob>) -> Vec<UnifiedJob> {
    jobs.into_iter()
        .filter_map(normalize_job)
        .filter(|job| !job.source.is_broad() || has_topical_signal(&job.title, job.description.as_deref()))
        .collect()
}
