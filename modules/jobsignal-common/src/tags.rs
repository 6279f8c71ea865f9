use serde::{Deserialize, Serialize};

/// Keywords that mark a posting as on-topic for the aggregate feed.
pub const TOPICAL_KEYWORDS: &[&str] = &[
    "web3",
    "blockchain",
    "crypto",
    "defi",
    "solidity",
    "smart contract",
    "dao",
    "evm",
    "ethereum",
    "bitcoin",
    "solana",
    "layer 2",
    "zk",
    "nft",
];

/// Topical keywords present in title + description (case-insensitive).
pub fn detect_tags(title: &str, description: Option<&str>) -> Vec<&'static str> {
    let haystack = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
    TOPICAL_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| haystack.contains(keyword))
        .collect()
}

pub fn has_topical_signal(title: &str, description: Option<&str>) -> bool {
    !detect_tags(title, description).is_empty()
}

// --- Role category ---

const TECH_HINTS: &[&str] = &[
    "engineer",
    "developer",
    "solidity",
    "backend",
    "frontend",
    "full stack",
    "smart contract",
    "devops",
    "data scientist",
    "security",
    "protocol",
];

const NON_TECH_HINTS: &[&str] = &[
    "marketing",
    "design",
    "sales",
    "support",
    "community",
    "product manager",
    "operations",
    "recruiter",
    "people ops",
    "content",
    "growth",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobCategory {
    Tech,
    NonTech,
    Hybrid,
}

/// Classify a posting from keyword hints. Postings with no hints at all
/// default to `Tech`.
pub fn classify_category(title: &str, company: &str, description: Option<&str>) -> JobCategory {
    let haystack = format!("{title} {company} {}", description.unwrap_or_default()).to_lowercase();
    let tech = TECH_HINTS.iter().any(|hint| haystack.contains(hint));
    let non_tech = NON_TECH_HINTS.iter().any(|hint| haystack.contains(hint));

    match (tech, non_tech) {
        (true, true) => JobCategory::Hybrid,
        (false, true) => JobCategory::NonTech,
        _ => JobCategory::Tech,
    }
}
