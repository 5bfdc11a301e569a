use async_trait::async_trait;
use chrono::Utc;
use es_core::{
    Article, CreateOutcome, Error, NewArticle, NewSignal, Result, Signal, SignalStorage, SignalView,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{StorageBackend, StorageConfig};

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    signals: Vec<Signal>,
    last_article_id: i64,
    last_signal_id: i64,
}

impl MemoryStore {
    pub fn find_article_by_url(&self, url: &str) -> Option<Article> {
        self.articles.iter().find(|a| a.url == url).cloned()
    }

    pub fn get_article(&self, id: i64) -> Option<Article> {
        self.articles.iter().find(|a| a.id == id).cloned()
    }

    pub fn create_article(&mut self, article: NewArticle) -> CreateOutcome {
        if self.articles.iter().any(|a| a.url == article.url) {
            return CreateOutcome::AlreadyExists;
        }
        self.last_article_id += 1;
        let stored = Article {
            id: self.last_article_id,
            url: article.url,
            title: article.title,
            authors: article.authors,
            text: article.text,
            published_at: article.published_at,
            created_at: Utc::now(),
        };
        self.articles.push(stored.clone());
        CreateOutcome::Created(stored)
    }

    pub fn create_signal(&mut self, signal: NewSignal) -> Result<Signal> {
        if !self.articles.iter().any(|a| a.id == signal.article_id) {
            return Err(Error::Storage(format!(
                "Signal references unknown article {}",
                signal.article_id
            )));
        }
        self.last_signal_id += 1;
        let stored = Signal {
            id: self.last_signal_id,
            article_id: signal.article_id,
            sentiment_label: signal.sentiment_label,
            sentiment_score: signal.sentiment_score,
            events: signal.events,
            score: signal.score,
            created_at: Utc::now(),
        };
        self.signals.push(stored.clone());
        Ok(stored)
    }

    pub fn list_signals(&self, limit: usize, offset: usize) -> Vec<SignalView> {
        let mut signals: Vec<&Signal> = self.signals.iter().collect();
        signals.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        signals
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|signal| {
                self.get_article(signal.article_id).map(|article| SignalView {
                    signal: signal.clone(),
                    article,
                })
            })
            .collect()
    }
}

/// Process-local storage; the write lock is the uniqueness boundary.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn new(_config: &StorageConfig) -> Result<Self> where Self: Sized {
        Ok(Self::default())
    }
}

#[async_trait]
impl SignalStorage for InMemoryStorage {
    async fn find_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        Ok(self.store.read().await.find_article_by_url(url))
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.store.read().await.get_article(id))
    }

    async fn create_article(&self, article: NewArticle) -> Result<CreateOutcome> {
        Ok(self.store.write().await.create_article(article))
    }

    async fn create_signal(&self, signal: NewSignal) -> Result<Signal> {
        self.store.write().await.create_signal(signal)
    }

    async fn list_signals(&self, limit: usize, offset: usize) -> Result<Vec<SignalView>> {
        Ok(self.store.read().await.list_signals(limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::EventSet;

    fn new_article(url: &str) -> NewArticle {
        NewArticle {
            url: url.to_string(),
            title: "Test Article".to_string(),
            authors: vec!["Test Author".to_string()],
            text: "Shares fell after a profit warning.".to_string(),
            published_at: None,
        }
    }

    fn new_signal(article_id: i64, score: f64) -> NewSignal {
        NewSignal {
            article_id,
            sentiment_label: "negative".to_string(),
            sentiment_score: 0.8,
            events: ["earnings warning"].into_iter().collect::<EventSet>(),
            score,
        }
    }

    #[tokio::test]
    async fn test_memory_storage_dedups_by_url() {
        let storage = InMemoryStorage::new();
        let first = storage.create_article(new_article("http://test.com/a")).await.unwrap();
        let second = storage.create_article(new_article("http://test.com/a")).await.unwrap();

        assert!(matches!(first, CreateOutcome::Created(ref a) if a.id == 1));
        assert_eq!(second, CreateOutcome::AlreadyExists);
        assert!(storage.find_article_by_url("http://test.com/a").await.unwrap().is_some());
        assert!(storage.find_article_by_url("http://TEST.com/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_storage_lists_newest_first() {
        let storage = InMemoryStorage::new();
        let CreateOutcome::Created(article) =
            storage.create_article(new_article("http://test.com/a")).await.unwrap()
        else {
            panic!("article should be created");
        };
        for score in [1.0, 2.0, 3.0] {
            storage.create_signal(new_signal(article.id, score)).await.unwrap();
        }

        let page = storage.list_signals(2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].signal.score, 3.0);
        assert_eq!(page[1].signal.score, 2.0);
        assert_eq!(page[0].article.url, "http://test.com/a");

        let rest = storage.list_signals(100, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].signal.score, 1.0);
    }

    #[tokio::test]
    async fn test_memory_storage_rejects_orphan_signal() {
        let storage = InMemoryStorage::new();
        assert!(storage.create_signal(new_signal(42, 1.0)).await.is_err());
    }
}
