/// Link extraction from free-form input text.
///
/// Finds share links like `https://videy.co/v?id=abc123` anywhere in the text
/// and resolves each id to a CDN download URL and a local file name.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use videy_shared::config::{DownloaderConfig, DEFAULT_CDN_BASE_URL, DEFAULT_SOURCE_HOST};
use videy_shared::errors::{VideyError, VideyResult};
use videy_shared::models::WorkItem;

// ====== REGEX PATTERNS ======

/// Share link on the default host: http(s)://videy.co/v?id={token}
static DEFAULT_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&link_pattern(DEFAULT_SOURCE_HOST)).unwrap()
});

fn link_pattern(source_host: &str) -> String {
    format!(r"https?://{}/v\?id=([A-Za-z0-9_]+)", regex::escape(source_host))
}

/// Turns raw text into deduplicated work items.
#[derive(Debug, Clone)]
pub struct Extractor {
    pattern: Regex,
    cdn_base_url: String,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_LINK_RE.clone(),
            cdn_base_url: DEFAULT_CDN_BASE_URL.to_string(),
        }
    }
}

impl Extractor {
    /// Extractor for links on `source_host`, resolving files against `cdn_base_url`.
    pub fn new(source_host: &str, cdn_base_url: impl Into<String>) -> VideyResult<Self> {
        Ok(Self {
            pattern: Regex::new(&link_pattern(source_host))?,
            cdn_base_url: cdn_base_url.into(),
        })
    }

    pub fn from_config(config: &DownloaderConfig) -> VideyResult<Self> {
        Self::new(&config.source_host, config.cdn_base_url.clone())
    }

    /// Scan the text for links. Never fails; unmatched text is ignored.
    /// Ids are unique in the result, kept at their first occurrence.
    pub fn extract(&self, text: &str) -> Vec<WorkItem> {
        let mut seen = HashSet::new();
        self.pattern
            .captures_iter(text)
            .filter_map(|cap| {
                let id = &cap[1];
                seen.insert(id.to_string())
                    .then(|| WorkItem::resolve(id, &self.cdn_base_url))
            })
            .collect()
    }

    /// Like [`extract`](Self::extract), but an empty result is an error.
    pub fn extract_required(&self, text: &str) -> VideyResult<Vec<WorkItem>> {
        let items = self.extract(text);
        if items.is_empty() {
            return Err(VideyError::NoWorkItems);
        }
        Ok(items)
    }
}

/// Extract with the default hosts.
pub fn extract(text: &str) -> Vec<WorkItem> {
    Extractor::default().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_link() {
        let items = extract("Check this out: https://videy.co/v?id=abc123");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "abc123");
        assert_eq!(items[0].source_url, "https://cdn.videy.co/abc123.mp4");
        assert_eq!(items[0].destination_name, "abc123.mp4");
    }

    #[test]
    fn test_duplicate_collapsed() {
        let items = extract("see https://videy.co/v?id=abc123 and again https://videy.co/v?id=abc123");
        assert_eq!(items, vec![WorkItem::resolve("abc123", "https://cdn.videy.co")]);
    }

    #[test]
    fn test_first_occurrence_order() {
        let text = "http://videy.co/v?id=b2\nhttps://videy.co/v?id=a1\nhttps://videy.co/v?id=b2\nhttps://videy.co/v?id=c3";
        let ids: Vec<String> = extract(text).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b2", "a1", "c3"]);
    }

    #[test]
    fn test_no_links() {
        assert!(extract("Just a regular message with no links").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_other_hosts_ignored() {
        assert!(extract("https://example.com/v?id=abc123").is_empty());
        assert!(extract("https://videyXco/v?id=abc123").is_empty());
    }

    #[test]
    fn test_scheme_is_case_sensitive() {
        assert!(extract("HTTPS://videy.co/v?id=abc123").is_empty());
        assert!(extract("ftp://videy.co/v?id=abc123").is_empty());
    }

    #[test]
    fn test_token_stops_at_non_word_char() {
        let items = extract("https://videy.co/v?id=ab_C9-xyz&t=1");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "ab_C9");
    }

    #[test]
    fn test_empty_token_not_matched() {
        assert!(extract("https://videy.co/v?id=").is_empty());
    }

    #[test]
    fn test_custom_hosts() {
        let extractor = Extractor::new("share.example.org", "https://files.example.org").unwrap();
        let items = extractor.extract("https://share.example.org/v?id=Q1 https://videy.co/v?id=Q2");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_url, "https://files.example.org/Q1.mp4");
    }

    #[test]
    fn test_extract_required_empty() {
        let err = Extractor::default().extract_required("nothing here").unwrap_err();
        assert!(matches!(err, VideyError::NoWorkItems));
    }
}
