use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use es_core::{Error, FeedEntry, FeedSource, Result};
use reqwest::Client;
use roxmltree::{Document, Node};
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::http::{build_client, get_bytes, FetcherConfig};
use crate::retry::RetryPolicy;

/// Reads RSS 2.0 and Atom feeds over HTTP.
#[derive(Debug, Clone)]
pub struct FeedReader {
    client: Client,
    retry: RetryPolicy,
}

impl FeedReader {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            retry: config.retry,
        })
    }
}

#[async_trait]
impl FeedSource for FeedReader {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let content = get_bytes(&self.client, &self.retry, url)
            .await
            .map_err(|e| Error::FeedUnavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let entries = parse_feed(url, &content)?;
        info!("📡 {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}

/// Parses an RSS or Atom document. Entries without a link are dropped.
///
/// Relative links are resolved against the feed URL. A malformed date only
/// costs its own entry the `published` field.
pub fn parse_feed(url: &str, content: &[u8]) -> Result<Vec<FeedEntry>> {
    let base = Url::parse(url).ok();
    if let Ok(channel) = rss::Channel::read_from(content) {
        return Ok(rss_entries(&channel, base.as_ref()));
    }

    let unavailable = |reason: String| Error::FeedUnavailable {
        url: url.to_string(),
        reason,
    };
    let xml = std::str::from_utf8(content).map_err(|e| unavailable(format!("not UTF-8: {}", e)))?;
    let doc = Document::parse(xml).map_err(|e| unavailable(format!("not XML: {}", e)))?;
    let root = doc.root_element();
    if !root.has_tag_name("feed") {
        return Err(unavailable(format!(
            "neither RSS nor Atom: root element <{}>",
            root.tag_name().name()
        )));
    }
    Ok(atom_entries(root, base.as_ref()))
}

fn rss_entries(channel: &rss::Channel, base: Option<&Url>) -> Vec<FeedEntry> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let link = item.link().map(str::trim).unwrap_or_default();
            if link.is_empty() {
                debug!("dropping RSS item without link: {:?}", item.title());
                return None;
            }

            let published = item
                .pub_date()
                .and_then(parse_date)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().iter().find_map(|d| parse_date(d)))
                });

            Some(FeedEntry {
                title: item.title().map(str::trim).unwrap_or_default().to_string(),
                link: resolve_link(base, link),
                published,
                summary: item.description().map(strip_html).unwrap_or_default(),
            })
        })
        .collect()
}

fn atom_entries(feed: Node<'_, '_>, base: Option<&Url>) -> Vec<FeedEntry> {
    feed.children()
        .filter(|node| node.has_tag_name("entry"))
        .filter_map(|entry| {
            let title = child_text(entry, "title").unwrap_or_default();
            let link = atom_link(entry).unwrap_or_default();
            if link.is_empty() {
                debug!("dropping Atom entry without link: {}", title);
                return None;
            }

            let published = child_text(entry, "published").and_then(|raw| {
                let parsed = parse_date(&raw);
                if parsed.is_none() {
                    debug!("unparsable Atom date {:?} on {}", raw, link);
                }
                parsed
            });

            let summary = child_text(entry, "summary")
                .or_else(|| child_text(entry, "content"))
                .map(|s| strip_html(&s))
                .unwrap_or_default();

            Some(FeedEntry {
                title,
                link: resolve_link(base, &link),
                published,
                summary,
            })
        })
        .collect()
}

/// All text under the first non-empty child element called `name`.
fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .filter(|child| child.has_tag_name(name))
        .map(|child| {
            child
                .descendants()
                .filter_map(|n| n.text().filter(|_| n.is_text()))
                .collect::<String>()
                .trim()
                .to_string()
        })
        .find(|text| !text.is_empty())
}

/// `rel="alternate"` (the default rel) first, else the first link with an href.
fn atom_link(entry: Node<'_, '_>) -> Option<String> {
    let links: Vec<_> = entry
        .children()
        .filter(|child| child.has_tag_name("link"))
        .filter_map(|link| {
            let href = link.attribute("href").map(str::trim).filter(|h| !h.is_empty())?;
            Some((link.attribute("rel").unwrap_or("alternate"), href))
        })
        .collect();
    links
        .iter()
        .find(|(rel, _)| *rel == "alternate")
        .or_else(|| links.first())
        .map(|(_, href)| href.to_string())
}

fn resolve_link(base: Option<&Url>, link: &str) -> String {
    if Url::parse(link).is_ok() {
        return link.to_string();
    }
    base.and_then(|b| b.join(link).ok())
        .map(String::from)
        .unwrap_or_else(|| link.to_string())
}

/// RFC 2822, then RFC 3339, then a bare `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        })
}

fn strip_html(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
