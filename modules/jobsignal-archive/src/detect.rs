// Recognise an employer's careers URL as one of the supported ATS providers
// and pull out the handle the directory needs for it.

use serde::Serialize;

use jobsignal_common::text::parse_http_url;
use jobsignal_common::JobSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedAts {
    pub source: JobSource,
    /// Board token, company slug, org name or company identifier.
    pub handle: String,
}

const PROVIDER_HOSTS: &[(&str, JobSource)] = &[
    ("greenhouse.io", JobSource::Greenhouse),
    ("jobs.lever.co", JobSource::Lever),
    ("ashbyhq.com", JobSource::Ashby),
    ("smartrecruiters.com", JobSource::SmartRecruiters),
];

/// Provider and handle for a careers URL. The handle is the last non-empty
/// path segment. `None` for unknown hosts or URLs without a path.
pub fn detect_ats(careers_url: &str) -> Option<DetectedAts> {
    let url = parse_http_url(careers_url)?;
    let host = url.host_str()?.to_ascii_lowercase();

    let source = PROVIDER_HOSTS
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
        .map(|(_, source)| *source)?;

    let handle = url
        .path_segments()?
        .rfind(|segment| !segment.is_empty())?
        .to_string();

    Some(DetectedAts { source, handle })
}
