use async_trait::async_trait;
use crate::types::{ArticleContent, FeedEntry};
use crate::Result;

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns the entries of the feed at `url`.
    ///
    /// Fails with `Error::FeedUnavailable` when the feed cannot be retrieved or parsed.
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>>;
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Downloads and extracts the article at `url`.
    ///
    /// Fails with `Error::Fetch` on network failure only; unreadable pages come
    /// back with empty text.
    async fn fetch_article(&self, url: &str) -> Result<ArticleContent>;
}
