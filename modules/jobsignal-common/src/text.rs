// Text and URL helpers shared by the connectors and the normalizer.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// Collapse runs of whitespace to a single space and trim.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value, " ").trim().to_string()
}

/// Collapsed text, `None` when nothing is left.
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    let out = collapse_whitespace(value?);
    (!out.is_empty()).then_some(out)
}

/// Decode the named entities feeds actually use plus numeric references.
pub fn decode_entities(input: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(input, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so "&amp;lt;" decodes to "&lt;" rather than "<".
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Plain text from an HTML fragment. Entity-encoded markup (Greenhouse sends
/// `&lt;p&gt;`) is decoded before tags are removed. `None` when empty.
pub fn strip_html(input: Option<&str>) -> Option<String> {
    let decoded = decode_entities(input?);
    let no_tags = TAG_RE.replace_all(&decoded, " ");
    normalize_text(Some(&no_tags))
}

/// Parse `raw` as an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Option<url::Url> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

pub fn is_valid_http_url(raw: &str) -> bool {
    parse_http_url(raw).is_some_and(|u| u.host_str().is_some())
}

/// Lowercased hostname of an http(s) URL.
pub fn host_of(raw: &str) -> Option<String> {
    parse_http_url(raw)?.host_str().map(str::to_ascii_lowercase)
}

/// True when `host` is `domain` or a subdomain of it. A leading `www.` on the
/// domain is ignored.
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
    let domain = domain.trim().to_ascii_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    if domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
