use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobSignalError;

// --- Sources ---

/// Connector identifiers. Serialized names match the persisted cache format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSource {
    Greenhouse,
    Lever,
    Ashby,
    #[serde(rename = "SMARTRECRUITERS")]
    SmartRecruiters,
    Remotive,
    Arbeitnow,
    #[serde(rename = "CRYPTOJOBSLIST")]
    CryptoJobsList,
    Web3Career,
    SolanaJobs,
    Plexus,
    CryptoDotJobs,
    Cryptocurrencyjobs,
    BaseHirechain,
    Superteam,
}

impl JobSource {
    pub const ALL: [JobSource; 14] = [
        JobSource::Greenhouse,
        JobSource::Lever,
        JobSource::Ashby,
        JobSource::SmartRecruiters,
        JobSource::Remotive,
        JobSource::Arbeitnow,
        JobSource::CryptoJobsList,
        JobSource::Web3Career,
        JobSource::SolanaJobs,
        JobSource::Plexus,
        JobSource::CryptoDotJobs,
        JobSource::Cryptocurrencyjobs,
        JobSource::BaseHirechain,
        JobSource::Superteam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Greenhouse => "GREENHOUSE",
            JobSource::Lever => "LEVER",
            JobSource::Ashby => "ASHBY",
            JobSource::SmartRecruiters => "SMARTRECRUITERS",
            JobSource::Remotive => "REMOTIVE",
            JobSource::Arbeitnow => "ARBEITNOW",
            JobSource::CryptoJobsList => "CRYPTOJOBSLIST",
            JobSource::Web3Career => "WEB3_CAREER",
            JobSource::SolanaJobs => "SOLANA_JOBS",
            JobSource::Plexus => "PLEXUS",
            JobSource::CryptoDotJobs => "CRYPTO_DOT_JOBS",
            JobSource::Cryptocurrencyjobs => "CRYPTOCURRENCYJOBS",
            JobSource::BaseHirechain => "BASE_HIRECHAIN",
            JobSource::Superteam => "SUPERTEAM",
        }
    }

    /// ATS-backed connectors. Provenance alone establishes trust for these.
    pub fn is_authoritative(&self) -> bool {
        matches!(
            self,
            JobSource::Greenhouse | JobSource::Lever | JobSource::Ashby | JobSource::SmartRecruiters
        )
    }

    /// General-purpose boards whose feeds are mostly off-topic and need the
    /// topical keyword filter.
    pub fn is_broad(&self) -> bool {
        matches!(self, JobSource::Remotive | JobSource::Arbeitnow)
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobSource {
    type Err = JobSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        JobSource::ALL
            .into_iter()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| JobSignalError::Validation(format!("unknown job source: {s}")))
    }
}

// --- Verification ---

/// Trust label for a posting. Declaration order is rank order, so the derived
/// `Ord` doubles as the sort key (SourceVerified > DomainVerified > Unverified).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationTier {
    Unverified,
    DomainVerified,
    SourceVerified,
}

impl VerificationTier {
    pub fn rank(&self) -> u8 {
        match self {
            VerificationTier::SourceVerified => 3,
            VerificationTier::DomainVerified => 2,
            VerificationTier::Unverified => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationTier::SourceVerified => "SOURCE_VERIFIED",
            VerificationTier::DomainVerified => "DOMAIN_VERIFIED",
            VerificationTier::Unverified => "UNVERIFIED",
        }
    }
}

impl fmt::Display for VerificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationTier {
    type Err = JobSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "source_verified" | "source" | "3" => Ok(VerificationTier::SourceVerified),
            "domain_verified" | "domain" | "2" => Ok(VerificationTier::DomainVerified),
            "unverified" | "1" => Ok(VerificationTier::Unverified),
            other => Err(JobSignalError::Validation(format!(
                "unknown verification tier: {other}"
            ))),
        }
    }
}

// --- Postings ---

/// One posting in the unified schema shared by every connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedJob {
    /// Dedupe hash once the record has been through the merge stage;
    /// a connector-local identifier before that.
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    /// `None` when the source does not say.
    pub remote: Option<bool>,
    pub description: Option<String>,
    pub apply_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub source: JobSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_domain: Option<String>,
    /// Other sources that surfaced the same posting in the run that produced it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corroborated_by: Vec<JobSource>,
}

impl UnifiedJob {
    /// A record with only the required fields set. Connectors fill in the rest
    /// with struct update syntax.
    pub fn new(
        source: JobSource,
        id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        apply_url: impl Into<String>,
        first_seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            location: None,
            remote: None,
            description: None,
            apply_url: apply_url.into(),
            posted_at: None,
            first_seen_at,
            source,
            source_name: None,
            source_url: None,
            website_domain: None,
            corroborated_by: Vec::new(),
        }
    }

    /// Timestamp used for freshness, merge and ordering: the source's publish
    /// time when known, otherwise the first time we saw the record.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.posted_at.unwrap_or(self.first_seen_at)
    }

    /// Every source that surfaced this posting, own source first.
    pub fn provenance(&self) -> impl Iterator<Item = JobSource> + '_ {
        std::iter::once(self.source).chain(self.corroborated_by.iter().copied())
    }
}

/// The persisted snapshot. Replaced wholesale on every successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsCache {
    pub generated_at: DateTime<Utc>,
    pub jobs: Vec<UnifiedJob>,
}

impl JobsCache {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.generated_at
    }
}

// --- Run stats ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub source: JobSource,
    pub seen: u32,
    pub kept: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub generated_at: DateTime<Utc>,
    pub jobs_seen: u32,
    pub jobs_kept: u32,
    pub jobs_deduped: u32,
    pub source_breakdown: Vec<SourceBreakdown>,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Ingest Run Complete ===")?;
        writeln!(f, "Generated at: {}", self.generated_at.to_rfc3339())?;
        writeln!(f, "Jobs seen:    {}", self.jobs_seen)?;
        writeln!(f, "Jobs deduped: {}", self.jobs_deduped)?;
        writeln!(f, "Jobs kept:    {}", self.jobs_kept)?;
        writeln!(f, "\nBy source:")?;
        for row in &self.source_breakdown {
            writeln!(f, "  {:<20} seen {:>5}  kept {:>5}", row.source, row.seen, row.kept)?;
        }
        Ok(())
    }
}

// --- Company directory ---

/// One employer entry in the directory. The per-provider handle goes by a
/// different name in each list of the JSON file, hence the aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryCompany {
    pub name: String,
    #[serde(alias = "boardToken", alias = "companySlug", alias = "orgSlug", alias = "companyIdentifier")]
    pub handle: String,
    #[serde(default)]
    pub website_domain: Option<String>,
}

impl DirectoryCompany {
    pub fn new(name: &str, handle: &str, website_domain: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            handle: handle.to_string(),
            website_domain: website_domain.map(str::to_string),
        }
    }

    /// Trimmed handle, `None` when blank.
    pub fn handle(&self) -> Option<&str> {
        let handle = self.handle.trim();
        (!handle.is_empty()).then_some(handle)
    }
}

/// Externally owned list of employers per authoritative provider. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDirectory {
    #[serde(default)]
    pub greenhouse_boards: Vec<DirectoryCompany>,
    #[serde(default)]
    pub lever_companies: Vec<DirectoryCompany>,
    #[serde(default)]
    pub ashby_orgs: Vec<DirectoryCompany>,
    #[serde(default)]
    pub smart_recruiters_companies: Vec<DirectoryCompany>,
}

impl CompanyDirectory {
    /// Entries configured for one authoritative provider. Empty for any other source.
    pub fn companies_for(&self, source: JobSource) -> &[DirectoryCompany] {
        match source {
            JobSource::Greenhouse => &self.greenhouse_boards,
            JobSource::Lever => &self.lever_companies,
            JobSource::Ashby => &self.ashby_orgs,
            JobSource::SmartRecruiters => &self.smart_recruiters_companies,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.greenhouse_boards.len()
            + self.lever_companies.len()
            + self.ashby_orgs.len()
            + self.smart_recruiters_companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
