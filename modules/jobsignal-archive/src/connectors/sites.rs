// Niche job boards without an API. Each site is tried as a feed first
// (configured candidates, then feeds the listing page advertises), and only
// when no feed yields items does the listing page get scraped for job links.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use jobsignal_common::{JobSource, UnifiedJob};

use super::{short_hash, Connector, FetchContext};
use crate::feed::{discover_feed_urls, looks_like_feed, parse_feed_items, FeedItem};
use crate::http::{fetch_text, HttpFetch};
use crate::links::extract_job_links;

const UNTITLED_ROLE: &str = "Untitled role";

/// "Title at Company" as used by most board feeds.
static TITLE_AT_COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?P<title>.+)\s+at\s+(?P<company>.+)$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub source: JobSource,
    pub name: &'static str,
    /// Tried in order; the first one that parses to at least one item wins.
    pub feed_urls: &'static [&'static str],
    pub listing_url: &'static str,
}

pub const BOARD_SITES: &[SiteConfig] = &[
    SiteConfig {
        source: JobSource::CryptoJobsList,
        name: "CryptoJobsList",
        feed_urls: &["https://cryptojobslist.com/feed", "https://cryptojobslist.com/rss"],
        listing_url: "https://cryptojobslist.com/",
    },
    SiteConfig {
        source: JobSource::Web3Career,
        name: "Web3.career",
        feed_urls: &["https://web3.career/feed", "https://web3.career/rss"],
        listing_url: "https://web3.career/",
    },
    SiteConfig {
        source: JobSource::SolanaJobs,
        name: "Solana Jobs",
        feed_urls: &["https://jobs.solana.com/jobs/rss", "https://jobs.solana.com/feed"],
        listing_url: "https://jobs.solana.com/jobs",
    },
    SiteConfig {
        source: JobSource::Plexus,
        name: "Plexus",
        feed_urls: &["https://plexusrs.com/jobs/feed", "https://plexusrs.com/feed"],
        listing_url: "https://plexusrs.com/jobs",
    },
    SiteConfig {
        source: JobSource::CryptoDotJobs,
        name: "Crypto.jobs",
        feed_urls: &["https://crypto.jobs/feed", "https://crypto.jobs/rss"],
        listing_url: "https://crypto.jobs/",
    },
    SiteConfig {
        source: JobSource::Cryptocurrencyjobs,
        name: "CryptocurrencyJobs",
        feed_urls: &["https://cryptocurrencyjobs.co/feed", "https://cryptocurrencyjobs.co/rss"],
        listing_url: "https://cryptocurrencyjobs.co/",
    },
    SiteConfig {
        source: JobSource::BaseHirechain,
        name: "Base Ecosystem Jobs",
        feed_urls: &[],
        listing_url: "https://base.hirechain.io/jobs",
    },
    SiteConfig {
        source: JobSource::Superteam,
        name: "Superteam Talent",
        feed_urls: &[],
        listing_url: "https://talent.superteam.fun/",
    },
];

/// Split a feed title into `(title, company)`. Without an "at" clause the
/// whole string is the title and `fallback_company` is used.
pub(crate) fn split_title_company(raw: &str, fallback_company: &str) -> (String, String) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (UNTITLED_ROLE.to_string(), fallback_company.to_string());
    }
    match TITLE_AT_COMPANY_RE.captures(raw) {
        Some(caps) => {
            let title = caps["title"].trim();
            let company = caps["company"].trim();
            let company = if company.is_empty() { fallback_company } else { company };
            (title.to_string(), company.to_string())
        }
        None => (raw.to_string(), fallback_company.to_string()),
    }
}

pub struct SiteConnector {
    http: Arc<dyn HttpFetch>,
    site: SiteConfig,
}

impl SiteConnector {
    pub fn new(http: Arc<dyn HttpFetch>, site: SiteConfig) -> Self {
        Self { http, site }
    }

    fn job_id(&self, url: &str) -> String {
        format!(
            "{}-{}",
            self.site.source.as_str().to_ascii_lowercase(),
            short_hash(self.site.source, url)
        )
    }

    /// Items from one feed URL that carry a link. Empty when the URL is not a feed.
    async fn try_feed(&self, feed_url: &str) -> Vec<FeedItem> {
        let Some(body) = fetch_text(self.http.as_ref(), feed_url).await else {
            return Vec::new();
        };
        if !looks_like_feed(&body) {
            debug!(source = %self.site.source, url = feed_url, "sites: not a feed");
            return Vec::new();
        }
        parse_feed_items(&body)
            .into_iter()
            .filter(|item| item.link.as_deref().is_some_and(|l| !l.trim().is_empty()))
            .collect()
    }

    fn from_feed(&self, feed_url: &str, items: Vec<FeedItem>, ctx: &FetchContext) -> Vec<UnifiedJob> {
        items
            .into_iter()
            .filter_map(|item| {
                let link = item.link?.trim().to_string();
                let (title, company) = split_title_company(item.title.as_deref().unwrap_or(""), self.site.name);
                Some(UnifiedJob {
                    description: item.description,
                    posted_at: item.published,
                    source_name: Some(self.site.name.to_string()),
                    source_url: Some(feed_url.to_string()),
                    ..UnifiedJob::new(self.site.source, self.job_id(&link), title, company, link, ctx.now)
                })
            })
            .collect()
    }

    fn from_listing(&self, html: &str, ctx: &FetchContext) -> Vec<UnifiedJob> {
        extract_job_links(html, self.site.listing_url)
            .into_iter()
            .map(|link| UnifiedJob {
                source_name: Some(self.site.name.to_string()),
                source_url: Some(self.site.listing_url.to_string()),
                ..UnifiedJob::new(
                    self.site.source,
                    self.job_id(&link.url),
                    link.title,
                    self.site.name,
                    link.url,
                    ctx.now,
                )
            })
            .collect()
    }

    async fn collect(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        for feed_url in self.site.feed_urls {
            let items = self.try_feed(feed_url).await;
            if !items.is_empty() {
                return self.from_feed(feed_url, items, ctx);
            }
        }

        let Some(html) = fetch_text(self.http.as_ref(), self.site.listing_url).await else {
            return Vec::new();
        };

        for feed_url in discover_feed_urls(&html, self.site.listing_url) {
            if self.site.feed_urls.iter().any(|tried| *tried == feed_url) {
                continue;
            }
            let items = self.try_feed(&feed_url).await;
            if !items.is_empty() {
                return self.from_feed(&feed_url, items, ctx);
            }
        }

        self.from_listing(&html, ctx)
    }
}

#[async_trait]
impl Connector for SiteConnector {
    fn source(&self) -> JobSource {
        self.site.source
    }

    async fn fetch(&self, ctx: &FetchContext) -> Vec<UnifiedJob> {
        let jobs = self.collect(ctx).await;
        info!(source = %self.site.source, jobs = jobs.len(), "connector: fetched");
        jobs
    }
}
