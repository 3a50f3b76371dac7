//! Evidence search — corroborating material for a claim string.
//!
//! Queries configured RSS feeds first (score 0.9), then falls back to
//! scanning general search-result pages for loosely matching anchors
//! (score 0.6) when the feeds come up short. Hits are returned in
//! discovery order and capped at the requested limit.
//!
//! The contract is never-fails: any per-source fetch or parse problem is
//! logged at debug and that source is skipped.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use verita_core::config::{EvidenceConfig, FeedSource, PageSource};
use verita_core::models::EvidenceHit;

/// Source-type confidence for a structured-feed match.
pub const FEED_SCORE: f32 = 0.9;
/// Source-type confidence for an ad-hoc page-scrape match.
pub const SCRAPE_SCORE: f32 = 0.6;

const FEED_SNIPPET_LEN: usize = 300;
const SCRAPE_SNIPPET_LEN: usize = 200;

#[async_trait]
pub trait EvidenceSearch: Send + Sync {
    /// Collect up to `limit` hits. Never fails; an empty list is a valid
    /// answer.
    async fn search(&self, query: &str, limit: usize) -> Vec<EvidenceHit>;
}

pub struct FeedEvidenceSearch {
    client: reqwest::Client,
    feeds: Vec<FeedSource>,
    fallback_pages: Vec<PageSource>,
}

impl FeedEvidenceSearch {
    pub fn new(config: &EvidenceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            feeds: config.feeds.clone(),
            fallback_pages: config.fallback_pages.clone(),
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client.get(url).send().await?.text().await
    }
}

#[async_trait]
impl EvidenceSearch for FeedEvidenceSearch {
    async fn search(&self, query: &str, limit: usize) -> Vec<EvidenceHit> {
        let mut hits = Vec::new();
        if limit == 0 {
            return hits;
        }

        let needle = query.to_lowercase();

        for feed in &self.feeds {
            if hits.len() >= limit {
                break;
            }

            let xml = match self.fetch_text(&feed.url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(feed = %feed.name, error = %e, "feed fetch failed");
                    continue;
                }
            };

            for item in parse_feed_items(&xml) {
                if hits.len() >= limit {
                    break;
                }
                let haystack = format!("{} {}", item.title, item.description).to_lowercase();
                if haystack.contains(&needle) {
                    hits.push(EvidenceHit {
                        source: feed.name.clone(),
                        title: item.title,
                        url: (!item.link.is_empty()).then_some(item.link),
                        snippet: truncate(&item.description, FEED_SNIPPET_LEN),
                        score: FEED_SCORE,
                    });
                }
            }
        }

        if hits.len() < limit {
            for page in &self.fallback_pages {
                if hits.len() >= limit {
                    break;
                }

                let page_url = page.url.replace("{query}", &percent_encode(query));
                let html = match self.fetch_text(&page_url).await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::debug!(page = %page.name, error = %e, "page fetch failed");
                        continue;
                    }
                };

                for anchor in extract_anchors(&html) {
                    if hits.len() >= limit {
                        break;
                    }
                    if anchor.text.to_lowercase().contains(&needle) {
                        hits.push(EvidenceHit {
                            source: page.name.clone(),
                            title: anchor.text.clone(),
                            url: resolve_href(&page_url, &anchor.href),
                            snippet: truncate(&anchor.text, SCRAPE_SNIPPET_LEN),
                            score: SCRAPE_SCORE,
                        });
                    }
                }
            }
        }

        hits
    }
}

// ============================================================================
// Parsing helpers (pure)
// ============================================================================

#[derive(Debug, Default, Clone)]
pub(crate) struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
}

enum ItemField {
    Title,
    Link,
    Description,
}

/// Pull `<item>` entries out of an RSS document. Malformed XML yields
/// whatever was parsed up to the error.
pub(crate) fn parse_feed_items(xml: &str) -> Vec<FeedItem> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut current = FeedItem::default();
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => {
                    in_item = true;
                    current = FeedItem::default();
                }
                b"title" if in_item => field = Some(ItemField::Title),
                b"link" if in_item => field = Some(ItemField::Link),
                b"description" if in_item => field = Some(ItemField::Description),
                _ => field = None,
            },
            Ok(quick_xml::events::Event::Text(t)) => {
                if let Some(f) = &field {
                    let text = t.unescape().unwrap_or_default();
                    append_field(&mut current, f, text.as_ref());
                }
            }
            Ok(quick_xml::events::Event::CData(t)) => {
                if let Some(f) = &field {
                    let text = String::from_utf8_lossy(&t);
                    append_field(&mut current, f, text.as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"item" => {
                    if in_item {
                        items.push(std::mem::take(&mut current));
                    }
                    in_item = false;
                    field = None;
                }
                b"title" | b"link" | b"description" => field = None,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                tracing::debug!(error = %e, "feed parse error, keeping partial items");
                break;
            }
            _ => {}
        }
    }

    items
}

fn append_field(item: &mut FeedItem, field: &ItemField, text: &str) {
    let target = match field {
        ItemField::Title => &mut item.title,
        ItemField::Link => &mut item.link,
        ItemField::Description => &mut item.description,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text.trim());
}

#[derive(Debug, Clone)]
pub(crate) struct Anchor {
    pub href: String,
    pub text: String,
}

/// Pull `<a href=...>` anchors with non-empty text out of an HTML page.
pub(crate) fn extract_anchors(html: &str) -> Vec<Anchor> {
    let anchor_re = match Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
    {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let tag_re = match Regex::new(r"<[^>]+>") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    anchor_re
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str().trim().to_string();
            let inner = caps.get(2)?.as_str();
            let text = tag_re.replace_all(inner, " ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                None
            } else {
                Some(Anchor { href, text })
            }
        })
        .collect()
}

/// Make a possibly-relative href absolute against the page it came from.
/// Unresolvable hrefs are dropped.
fn resolve_href(base: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = reqwest::Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn percent_encode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
