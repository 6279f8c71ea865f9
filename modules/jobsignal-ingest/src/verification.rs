// Trust tier for a merged posting.
//
// Provenance beats host: any authoritative source behind the record makes it
// SOURCE_VERIFIED regardless of where its apply link points. Only records
// without authoritative provenance are judged by the apply link's host.

use jobsignal_common::text::{host_matches_domain, host_of};
use jobsignal_common::{UnifiedJob, VerificationTier};

/// Hosts operated by the supported ATS providers. Subdomains match too.
pub const KNOWN_ATS_HOSTS: &[&str] = &[
    "greenhouse.io",
    "jobs.lever.co",
    "api.lever.co",
    "jobs.ashbyhq.com",
    "careers.smartrecruiters.com",
    "jobs.smartrecruiters.com",
    "api.smartrecruiters.com",
];

/// True when `apply_url`'s host is ATS infrastructure or the employer's own domain.
pub fn apply_host_is_trusted(apply_url: &str, website_domain: Option<&str>) -> bool {
    let Some(host) = host_of(apply_url) else {
        return false;
    };
    KNOWN_ATS_HOSTS.iter().any(|known| host_matches_domain(&host, known))
        || website_domain.is_some_and(|domain| host_matches_domain(&host, domain))
}

pub fn classify(job: &UnifiedJob) -> VerificationTier {
    if job.provenance().any(|source| source.is_authoritative()) {
        VerificationTier::SourceVerified
    } else if apply_host_is_trusted(&job.apply_url, job.website_domain.as_deref()) {
        VerificationTier::DomainVerified
    } else {
        VerificationTier::Unverified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobsignal_common::JobSource;

    fn job(source: JobSource, url: &str, domain: Option<&str>) -> UnifiedJob {
        UnifiedJob {
            website_domain: domain.map(str::to_string),
            ..UnifiedJob::new(source, "x", "Engineer", "Acme", url, Utc::now())
        }
    }

    #[test]
    fn authoritative_source_wins_over_unknown_host() {
        let j = job(JobSource::Greenhouse, "https://apply.workable-clone.net/acme/1", None);
        assert_eq!(classify(&j), VerificationTier::SourceVerified);
    }

    #[test]
    fn employer_domain_match_is_domain_verified() {
        let j = job(JobSource::CryptoJobsList, "https://careers.acme.io/jobs/1", Some("www.acme.io"));
        assert_eq!(classify(&j), VerificationTier::DomainVerified);
    }

    #[test]
    fn ats_host_is_domain_verified_for_board_records() {
        let j = job(JobSource::Web3Career, "https://jobs.lever.co/acme/1", None);
        assert_eq!(classify(&j), VerificationTier::DomainVerified);
        let j = job(JobSource::Web3Career, "https://boards.greenhouse.io/acme/jobs/1", None);
        assert_eq!(classify(&j), VerificationTier::DomainVerified);
    }

    #[test]
    fn corroboration_by_an_authoritative_source_counts() {
        let mut j = job(JobSource::Web3Career, "https://web3.career/job/1", None);
        assert_eq!(classify(&j), VerificationTier::Unverified);
        j.corroborated_by = vec![JobSource::Ashby];
        assert_eq!(classify(&j), VerificationTier::SourceVerified);
    }

    #[test]
    fn lookalike_hosts_are_not_trusted() {
        let j = job(JobSource::Remotive, "https://notacme.io/jobs/1", Some("acme.io"));
        assert_eq!(classify(&j), VerificationTier::Unverified);
    }
}
