use async_trait::async_trait;
use chrono::{DateTime, Utc};
use es_core::{ArticleContent, ArticleSource, Error, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::feed::parse_date;
use crate::http::{build_client, get_text, FetcherConfig};
use crate::jsonld;
use crate::retry::RetryPolicy;

/// Downloads article pages and extracts their readable content.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl ArticleFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            retry: config.retry,
        })
    }
}

#[async_trait]
impl ArticleSource for ArticleFetcher {
    async fn fetch_article(&self, url: &str) -> Result<ArticleContent> {
        let html = get_text(&self.client, &self.retry, url)
            .await
            .map_err(|e| Error::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let content = extract_article(url, &html);
        if content.is_degraded() {
            debug!("no readable text in {}", url);
        }
        Ok(content)
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn extract_title(document: &Html) -> String {
    meta_content(document, "meta[property='og:title']")
        .or_else(|| first_text(document, "h1"))
        .or_else(|| first_text(document, "title"))
        .unwrap_or_default()
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut found = jsonld::extract_authors(document);
    if found.is_empty() {
        if let Some(sel) = selector("meta[name='author']") {
            found.extend(
                document
                    .select(&sel)
                    .filter_map(|el| el.value().attr("content"))
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty()),
            );
        }
    }

    let mut authors: Vec<String> = Vec::with_capacity(found.len());
    for author in found {
        if !authors.contains(&author) {
            authors.push(author);
        }
    }
    authors
}

fn extract_publish_date(document: &Html) -> Option<DateTime<Utc>> {
    meta_content(document, "meta[property='article:published_time']")
        .and_then(|d| parse_date(&d))
        .or_else(|| jsonld::extract_date_published(document).and_then(|d| parse_date(&d)))
}

fn extract_text(document: &Html) -> String {
    let paragraphs = |css: &str| -> Vec<String> {
        selector(css)
            .map(|sel| {
                document
                    .select(&sel)
                    .map(element_text)
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut body = paragraphs("article p");
    if body.is_empty() {
        body = paragraphs("p");
    }
    body.join("\n\n")
}

/// Extracts title, authors, publish date and body text from an article page.
///
/// Never fails: missing parts come back empty, so a page without paragraphs
/// yields empty `text`.
pub fn extract_article(url: &str, html: &str) -> ArticleContent {
    let document = Html::parse_document(html);
    ArticleContent {
        url: url.to_string(),
        title: extract_title(&document),
        text: extract_text(&document),
        authors: extract_authors(&document),
        publish_date: extract_publish_date(&document),
    }
}
