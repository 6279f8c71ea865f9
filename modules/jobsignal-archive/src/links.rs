use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use jobsignal_common::text::{collapse_whitespace, decode_entities};

/// Upper bound on links taken from one listing page.
pub const MAX_JOB_LINKS: usize = 120;

/// Anchor elements with an `href`; group 1 is the href, group 2 the inner HTML.
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).expect("valid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Role, seniority and function vocabulary that marks an anchor as a posting.
static JOBISH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)job|career|engineer|developer|manager|designer|analyst|marketing|\bintern(ship)?s?\b|senior|junior|\bleads?\b|head of|solidity|blockchain|crypto|web3",
    )
    .expect("valid regex")
});

/// A job-looking link pulled off a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLink {
    pub title: String,
    pub url: String,
}

/// Resolve a raw href against a base URL, returning an absolute http(s) URL
/// with the fragment stripped.
fn resolve_href(raw: &str, base: Option<&url::Url>) -> Option<String> {
    let raw = raw.trim();
    let mut parsed = if raw.starts_with("http://") || raw.starts_with("https://") {
        url::Url::parse(raw).ok()?
    } else {
        base?.join(raw).ok()?
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Extract anchors whose href or visible text looks like a job posting.
/// Relative hrefs resolve against `base_url`; results are deduplicated by
/// resolved URL and capped at `MAX_JOB_LINKS`. Anchors without visible text
/// are skipped.
pub fn extract_job_links(html: &str, base_url: &str) -> Vec<JobLink> {
    let base = url::Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for cap in ANCHOR_RE.captures_iter(html) {
        let href = &cap[1];
        let text = collapse_whitespace(&decode_entities(&TAG_RE.replace_all(&cap[2], " ")));
        if text.is_empty() {
            continue;
        }
        if !JOBISH_RE.is_match(href) && !JOBISH_RE.is_match(&text) {
            continue;
        }
        let Some(url) = resolve_href(href, base.as_ref()) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        links.push(JobLink { title: text, url });
        if links.len() >= MAX_JOB_LINKS {
            break;
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_anchors_are_extracted_with_their_text() {
        let html = r#"<a href="https://acme.io/jobs/42">Senior Rust Engineer</a>"#;
        let links = extract_job_links(html, "https://board.io");
        assert_eq!(
            links,
            vec![JobLink {
                title: "Senior Rust Engineer".into(),
                url: "https://acme.io/jobs/42".into()
            }]
        );
    }

    #[test]
    fn non_job_anchors_are_ignored() {
        let html = r#"
            <a href="/about">About us</a>
            <a href="/pricing">Pricing</a>
            <a href="/jobs/7">Apply</a>
        "#;
        let links = extract_job_links(html, "https://board.io");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://board.io/jobs/7");
    }

    #[test]
    fn short_role_words_match_whole_words_only() {
        let html = r#"
            <a href="/leaderboard">Leaderboard</a>
            <a href="/international">International</a>
            <a href="/internet">Internet</a>
            <a href="/p/1">Lead Engineer</a>
            <a href="/p/2">Summer Internship</a>
            <a href="/team/lead">Team</a>
        "#;
        let urls: Vec<String> = extract_job_links(html, "https://board.io").into_iter().map(|l| l.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://board.io/p/1".to_string(),
                "https://board.io/p/2".to_string(),
                "https://board.io/team/lead".to_string(),
            ]
        );
    }

    #[test]
    fn match_on_visible_text_alone_is_enough() {
        let html = r#"<a href="/p/123">Product Designer</a>"#;
        let links = extract_job_links(html, "https://board.io/list/");
        assert_eq!(links[0].url, "https://board.io/p/123");
    }

    #[test]
    fn nested_markup_and_entities_are_flattened() {
        let html = r#"<a class="card" href="/jobs/1"><h3>R&amp;D <span>Engineer</span></h3></a>"#;
        let links = extract_job_links(html, "https://board.io");
        assert_eq!(links[0].title, "R&D Engineer");
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let html = r#"<a href="engineer-1">Engineer</a>"#;
        let links = extract_job_links(html, "https://board.io/jobs/");
        assert_eq!(links[0].url, "https://board.io/jobs/engineer-1");
    }

    #[test]
    fn same_url_is_kept_once_ignoring_fragments() {
        let html = r#"
            <a href="/jobs/1#top">Engineer</a>
            <a href="/jobs/1">Engineer (again)</a>
        "#;
        let links = extract_job_links(html, "https://board.io");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Engineer");
    }

    #[test]
    fn empty_text_and_non_http_links_are_skipped() {
        let html = r#"
            <a href="/jobs/1"><img src="logo.png"></a>
            <a href="mailto:jobs@board.io">Email our jobs team</a>
            <a href="javascript:void(0)">Jobs menu</a>
        "#;
        assert!(extract_job_links(html, "https://board.io").is_empty());
    }

    #[test]
    fn links_are_capped() {
        let html: String = (0..300)
            .map(|i| format!(r#"<a href="/jobs/{i}">Engineer {i}</a>"#))
            .collect();
        assert_eq!(extract_job_links(&html, "https://board.io").len(), MAX_JOB_LINKS);
    }

    #[test]
    fn malformed_base_only_keeps_absolute_links() {
        let html = r#"<a href="/jobs/1">Engineer</a><a href="https://x.io/jobs/2">Engineer</a>"#;
        let links = extract_job_links(html, "not a url");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://x.io/jobs/2");
    }
}
