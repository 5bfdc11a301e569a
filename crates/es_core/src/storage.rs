use async_trait::async_trait;
use crate::types::{Article, CreateOutcome, NewArticle, NewSignal, Signal, SignalView};
use crate::Result;

#[async_trait]
pub trait SignalStorage: Send + Sync {
    /// Look up an article by its exact URL
    async fn find_article_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// Look up an article by id
    async fn get_article(&self, id: i64) -> Result<Option<Article>>;

    /// Insert an article; a URL that is already stored yields `AlreadyExists`
    async fn create_article(&self, article: NewArticle) -> Result<CreateOutcome>;

    /// Insert a signal for an existing article
    async fn create_signal(&self, signal: NewSignal) -> Result<Signal>;

    /// Signals with their articles, newest first
    async fn list_signals(&self, limit: usize, offset: usize) -> Result<Vec<SignalView>>;
}
