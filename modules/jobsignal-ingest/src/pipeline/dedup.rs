// Content-addressed dedupe and merge.
//
// Two stages share one merge rule (content of the record with the latest
// reference time, provenance of the earliest first sighting):
//   1. hash dedupe: same company/title/location/apply URL
//   2. cross-source collapse: same company/title/location seen by different sources

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use jobsignal_common::UnifiedJob;

fn key_part(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Canonical fingerprint: sha256 hex of lowercased, trimmed
/// `company|title|location|applyUrl`.
pub fn dedupe_hash(company: &str, title: &str, location: Option<&str>, apply_url: &str) -> String {
    let raw = format!(
        "{}|{}|{}|{}",
        key_part(company),
        key_part(title),
        key_part(location.unwrap_or_default()),
        key_part(apply_url)
    );
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

pub fn job_hash(job: &UnifiedJob) -> String {
    dedupe_hash(&job.company, &job.title, job.location.as_deref(), &job.apply_url)
}

/// Identity of a posting independent of where it is applied to.
fn posting_identity(job: &UnifiedJob) -> String {
    format!(
        "{}|{}|{}",
        key_part(&job.company),
        key_part(&job.title),
        key_part(job.location.as_deref().unwrap_or_default())
    )
}

/// Carry `first_seen_at` forward from the previous snapshot for every
/// incoming record whose hash it already contained.
pub fn merge_first_seen(previous: &[UnifiedJob], incoming: Vec<UnifiedJob>) -> Vec<UnifiedJob> {
    if previous.is_empty() {
        return incoming;
    }
    let first_seen: HashMap<String, _> = previous
        .iter()
        .map(|job| (job_hash(job), job.first_seen_at))
        .collect();

    incoming
        .into_iter()
        .map(|mut job| {
            if let Some(seen) = first_seen.get(&job_hash(&job)) {
                job.first_seen_at = *seen;
            }
            job
        })
        .collect()
}

/// Merge two records describing the same posting. `incoming` wins on a tie.
/// The loser's sources are recorded on the winner as corroboration.
fn merge_pair(kept: UnifiedJob, incoming: UnifiedJob) -> UnifiedJob {
    let first_seen_at = kept.first_seen_at.min(incoming.first_seen_at);
    let (mut winner, loser) = if incoming.reference_time() >= kept.reference_time() {
        (incoming, kept)
    } else {
        (kept, incoming)
    };

    winner.first_seen_at = first_seen_at;
    for source in loser.provenance() {
        if source != winner.source && !winner.corroborated_by.contains(&source) {
            winner.corroborated_by.push(source);
        }
    }
    winner.corroborated_by.sort();
    winner
}

/// Collapse records sharing a hash. Survivors carry the hash as their `id`
/// and keep first-occurrence order.
pub fn dedupe_jobs(jobs: Vec<UnifiedJob>) -> Vec<UnifiedJob> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<UnifiedJob> = Vec::with_capacity(jobs.len());

    for mut job in jobs {
        let hash = job_hash(&job);
        job.id = hash.clone();
        match index.get(&hash) {
            Some(&slot) => {
                out[slot] = merge_pair(out[slot].clone(), job);
            }
            None => {
                index.insert(hash, out.len());
                out.push(job);
            }
        }
    }

    out
}

/// Collapse records that describe the same posting but came from different
/// sources (e.g. an ATS record and a board feed pointing at the employer's
/// own page). Records from the same source stay separate.
pub fn collapse_cross_source(jobs: Vec<UnifiedJob>) -> Vec<UnifiedJob> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut out: Vec<UnifiedJob> = Vec::with_capacity(jobs.len());

    for job in jobs {
        let identity = posting_identity(&job);
        let slots = groups.entry(identity).or_default();
        let target = slots
            .iter()
            .copied()
            .find(|&slot| !out[slot].provenance().any(|source| source == job.source));

        match target {
            Some(slot) => {
                out[slot] = merge_pair(out[slot].clone(), job);
            }
            None => {
                slots.push(out.len());
                out.push(job);
            }
        }
    }

    // Survivors may have taken another record's content; re-key them.
    for job in &mut out {
        job.id = job_hash(job);
    }
    out
}

/// Newest reference time first, then title, then id for a stable order.
pub fn sort_jobs(jobs: &mut [UnifiedJob]) {
    jobs.sort_by(|a, b| {
        b.reference_time()
            .cmp(&a.reference_time())
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}
