// RSS/Atom parsing for board feeds.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

static FEED_SNIFF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<rss|<feed").expect("valid regex"));

static FEED_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link[^>]+type\s*=\s*["']application/(rss\+xml|atom\+xml)["'][^>]*>"#)
        .expect("valid regex")
});

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// One entry from a feed, before it is mapped onto the unified schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// Cheap check that a response body is a feed rather than an HTML error page.
pub fn looks_like_feed(body: &str) -> bool {
    FEED_SNIFF_RE.is_match(body)
}

/// Parse an RSS or Atom document. CDATA and entities are decoded by the
/// parser. Returns an empty list for anything unparseable.
pub fn parse_feed_items(body: &str) -> Vec<FeedItem> {
    let feed = match feed_rs::parser::parse(body.as_bytes()) {
        Ok(feed) => feed,
        Err(e) => {
            debug!(error = %e, "feed: unparseable document");
            return Vec::new();
        }
    };

    feed.entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()));
            let description = entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body));

            FeedItem {
                title: entry.title.map(|t| t.content.trim().to_string()),
                link,
                description,
                published: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc)),
            }
        })
        .collect()
}

/// Discover RSS/Atom feed URLs advertised in a page's `<link>` tags.
pub fn discover_feed_urls(html: &str, base_url: &str) -> Vec<String> {
    let base = url::Url::parse(base_url).ok();
    let mut feeds = Vec::new();

    for cap in FEED_LINK_RE.captures_iter(html) {
        let tag = cap.get(0).map(|m| m.as_str()).unwrap_or("");
        let Some(href) = HREF_RE.captures(tag).and_then(|c| c.get(1)) else {
            continue;
        };
        let resolved = match base.as_ref() {
            Some(base) => base.join(href.as_str()).ok(),
            None => url::Url::parse(href.as_str()).ok(),
        };
        if let Some(url) = resolved {
            let url = url.to_string();
            if !feeds.contains(&url) {
                feeds.push(url);
            }
        }
    }

    feeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Board</title>
    <link>https://board.io</link>
    <description>Jobs</description>
    <item>
      <title>Smart Contract Engineer at Acme &amp; Co</title>
      <link>https://board.io/jobs/1</link>
      <description><![CDATA[<p>Write Solidity</p>]]></description>
      <pubDate>Mon, 03 Mar 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Board</title>
  <id>urn:board</id>
  <updated>2025-03-04T12:00:00Z</updated>
  <entry>
    <title>Protocol Engineer at Beta</title>
    <id>urn:job:2</id>
    <link href="https://board.io/jobs/2"/>
    <updated>2025-03-04T12:00:00Z</updated>
    <summary>Build the protocol</summary>
  </entry>
</feed>"#;

    #[test]
    fn sniffs_rss_and_atom_but_not_html() {
        assert!(looks_like_feed(RSS));
        assert!(looks_like_feed(ATOM));
        assert!(!looks_like_feed("<html><body>Not found</body></html>"));
    }

    #[test]
    fn rss_items_expose_title_link_description_and_date() {
        let items = parse_feed_items(RSS);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Smart Contract Engineer at Acme & Co"));
        assert_eq!(items[0].link.as_deref(), Some("https://board.io/jobs/1"));
        assert!(items[0].description.as_deref().unwrap_or_default().contains("Write Solidity"));
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap())
        );
        assert!(items[1].link.is_none());
    }

    #[test]
    fn atom_entries_use_updated_when_unpublished() {
        let items = parse_feed_items(ATOM);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link.as_deref(), Some("https://board.io/jobs/2"));
        assert_eq!(items[0].description.as_deref(), Some("Build the protocol"));
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn garbage_parses_to_nothing() {
        assert!(parse_feed_items("not a feed at all").is_empty());
        assert!(parse_feed_items("").is_empty());
    }

    #[test]
    fn discovers_advertised_feeds() {
        let html = r#"<head>
            <link rel="alternate" type="application/rss+xml" href="/jobs.rss">
            <link rel="alternate" type="application/atom+xml" href="https://board.io/atom.xml">
            <link rel="stylesheet" href="/style.css">
        </head>"#;
        let feeds = discover_feed_urls(html, "https://board.io/jobs");
        assert_eq!(feeds, vec!["https://board.io/jobs.rss", "https://board.io/atom.xml"]);
    }
}
