use async_trait::async_trait;
use es_core::{
    Article, ArticleContent, ArticleSource, CreateOutcome, Error, FeedEntry, FeedSource, NewArticle,
    NewSignal, Result, SentimentModel, SentimentScore, Signal, SignalStorage, SignalView,
};
use es_inference::models::{LexiconSentimentModel, RuleBasedLinguist};
use es_inference::{FeatureExtractor, ModelProvider};
use es_storage::InMemoryStorage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::pipeline::{PipelineConfig, SignalPipeline};

/// Feeds served from memory; unknown URLs are unavailable.
#[derive(Default)]
pub(crate) struct StaticFeeds {
    feeds: HashMap<String, Vec<FeedEntry>>,
}

impl StaticFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, links: &[&str]) -> Self {
        let entries = links
            .iter()
            .map(|link| FeedEntry {
                title: format!("Entry {}", link),
                link: link.to_string(),
                published: None,
                summary: String::new(),
            })
            .collect();
        self.feeds.insert(url.to_string(), entries);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        self.feeds.get(url).cloned().ok_or_else(|| Error::FeedUnavailable {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Article texts served from memory; unknown URLs fail to fetch.
#[derive(Default)]
pub(crate) struct StaticArticles {
    pages: HashMap<String, String>,
    pub fetched: Mutex<Vec<String>>,
}

impl StaticArticles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl ArticleSource for StaticArticles {
    async fn fetch_article(&self, url: &str) -> Result<ArticleContent> {
        self.fetched.lock().unwrap().push(url.to_string());
        let text = self.pages.get(url).ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            reason: "timed out".to_string(),
        })?;
        Ok(ArticleContent {
            url: url.to_string(),
            text: text.clone(),
            ..Default::default()
        })
    }
}

pub(crate) struct FailingSentiment;

#[async_trait]
impl SentimentModel for FailingSentiment {
    fn name(&self) -> &str {
        "failing"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<SentimentScore>> {
        Err(Error::Inference("endpoint returned 503".to_string()))
    }
}

/// Storage where another writer always inserts `contested` first: the lookup
/// misses but the insert reports `AlreadyExists`.
pub(crate) struct RacingStorage {
    inner: InMemoryStorage,
    contested: String,
}

impl RacingStorage {
    pub fn new(contested: &str) -> Self {
        Self {
            inner: InMemoryStorage::new(),
            contested: contested.to_string(),
        }
    }
}

#[async_trait]
impl SignalStorage for RacingStorage {
    async fn find_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        self.inner.find_article_by_url(url).await
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        self.inner.get_article(id).await
    }

    async fn create_article(&self, article: NewArticle) -> Result<CreateOutcome> {
        if article.url == self.contested {
            return Ok(CreateOutcome::AlreadyExists);
        }
        self.inner.create_article(article).await
    }

    async fn create_signal(&self, signal: NewSignal) -> Result<Signal> {
        self.inner.create_signal(signal).await
    }

    async fn list_signals(&self, limit: usize, offset: usize) -> Result<Vec<SignalView>> {
        self.inner.list_signals(limit, offset).await
    }
}

pub(crate) fn extractor() -> FeatureExtractor {
    let linguist = Arc::new(RuleBasedLinguist::load(None).unwrap());
    let sentiment = Arc::new(LexiconSentimentModel::load(None).unwrap());
    FeatureExtractor::new(Arc::new(ModelProvider::new(linguist, sentiment)))
}

pub(crate) fn pipeline_with(
    feeds: StaticFeeds,
    articles: StaticArticles,
    feed_urls: &[&str],
) -> (SignalPipeline, Arc<dyn SignalStorage>) {
    let storage: Arc<dyn SignalStorage> = Arc::new(InMemoryStorage::new());
    let pipeline = SignalPipeline::new(storage.clone(), Arc::new(feeds), Arc::new(articles), extractor())
        .with_config(PipelineConfig {
            feed_urls: feed_urls.iter().map(|u| u.to_string()).collect(),
            score_empty_articles: false,
        });
    (pipeline, storage)
}
