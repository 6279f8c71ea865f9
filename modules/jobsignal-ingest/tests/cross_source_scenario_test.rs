//! The same posting surfaced by an ATS connector and a board feed collapses
//! to one record, verified by the ATS provenance whichever copy is newer.

use chrono::{Duration, Utc};

use jobsignal_archive::ConnectorRegistry;
use jobsignal_common::{JobSource, JobsCache, UnifiedJob, VerificationTier};
use jobsignal_ingest::testing::{job, MockConnector};
use jobsignal_ingest::{classify, CacheStore, JobsQuery, JobsService};

const ATS_APPLY_URL: &str = "https://apply.hiring-portal.net/acme/backend-engineer";
const FEED_APPLY_URL: &str = "https://careers.acme.io/jobs/backend-engineer";

fn ats_record(posted_days_ago: i64) -> UnifiedJob {
    UnifiedJob {
        location: Some("Remote".into()),
        posted_at: Some(Utc::now() - Duration::days(posted_days_ago)),
        website_domain: Some("acme.io".into()),
        ..job(JobSource::Lever, "Backend Engineer", ATS_APPLY_URL)
    }
}

fn feed_record(posted_days_ago: i64) -> UnifiedJob {
    UnifiedJob {
        company: "ACME".into(),
        location: Some("remote".into()),
        posted_at: Some(Utc::now() - Duration::days(posted_days_ago)),
        ..job(JobSource::CryptoJobsList, " backend engineer ", FEED_APPLY_URL)
    }
}

async fn run(ats: UnifiedJob, feed: UnifiedJob, seed_first_seen: Option<Duration>) -> JobsCache {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path().join("jobs.json"), dir.path().join("fallback.json"));

    if let Some(age) = seed_first_seen {
        // An earlier run already saw the ATS copy.
        let earlier = Utc::now() - age;
        let seeded = UnifiedJob {
            first_seen_at: earlier,
            ..ats.clone()
        };
        store
            .write(&JobsCache {
                generated_at: earlier,
                jobs: vec![seeded],
            })
            .await
            .unwrap();
    }

    let registry = ConnectorRegistry::new()
        .register(MockConnector::new(JobSource::Lever).with_jobs(vec![ats]))
        .register(MockConnector::new(JobSource::CryptoJobsList).with_jobs(vec![feed]));
    let service = JobsService::new(
        registry,
        store,
        dir.path().join("companies.json"),
        Duration::days(14),
        Duration::hours(6),
    );

    let outcome = service.refresh().await.unwrap();
    outcome.cache.clone()
}

#[tokio::test]
async fn newer_feed_copy_supplies_content_and_ats_supplies_trust() {
    let cache = run(ats_record(3), feed_record(1), Some(Duration::days(3))).await;

    assert_eq!(cache.jobs.len(), 1);
    let survivor = &cache.jobs[0];
    assert_eq!(survivor.source, JobSource::CryptoJobsList);
    assert_eq!(survivor.apply_url, FEED_APPLY_URL);
    assert_eq!(survivor.corroborated_by, vec![JobSource::Lever]);
    assert!(
        Utc::now() - survivor.first_seen_at > Duration::days(2),
        "first sighting comes from the earlier run"
    );
    assert_eq!(classify(survivor), VerificationTier::SourceVerified);
}

#[tokio::test]
async fn newer_ats_copy_keeps_its_own_content() {
    let cache = run(ats_record(1), feed_record(2), None).await;

    assert_eq!(cache.jobs.len(), 1);
    let survivor = &cache.jobs[0];
    assert_eq!(survivor.source, JobSource::Lever);
    assert_eq!(survivor.apply_url, ATS_APPLY_URL);
    assert_eq!(survivor.corroborated_by, vec![JobSource::CryptoJobsList]);
    assert_eq!(classify(survivor), VerificationTier::SourceVerified);
}

#[tokio::test]
async fn feed_alone_on_employer_domain_is_domain_verified() {
    let feed = UnifiedJob {
        website_domain: Some("acme.io".into()),
        ..feed_record(1)
    };
    let other = ats_record(1);
    let cache = run(
        UnifiedJob {
            title: "Data Engineer".into(),
            ..other
        },
        feed,
        None,
    )
    .await;

    let views = JobsQuery::default().apply(&cache, Utc::now());
    assert_eq!(views.len(), 2);
    let feed_view = views
        .iter()
        .find(|v| v.job.source == JobSource::CryptoJobsList)
        .unwrap();
    assert_eq!(feed_view.tier, VerificationTier::DomainVerified);
    assert_eq!(views[0].tier, VerificationTier::SourceVerified);
}
