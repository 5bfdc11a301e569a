use es_core::{
    Article, ArticleSource, CreateOutcome, EventSet, FeatureBundle, FeedEntry, FeedSource,
    Error, NewArticle, NewSignal, Result, Signal, SignalStorage,
};
use es_inference::{EventClassifier, FeatureExtractor, Scorer};
use serde::Serialize;
use std::sync::Arc;

use crate::logging::Logger;

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.handelsblatt.com/rss",
    "https://www.faz.net/rss/aktuell/",
];

/// Label stored when the sentiment model produced nothing, e.g. for empty text.
pub const NO_SENTIMENT_LABEL: &str = "neutral";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub feed_urls: Vec<String>,
    /// Score articles whose text came back empty instead of recording them as degraded.
    pub score_empty_articles: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed_urls: DEFAULT_FEEDS.iter().map(|f| f.to_string()).collect(),
            score_empty_articles: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyStored,
    /// Another writer stored the same URL between lookup and insert.
    LostRace,
}

/// What happened to one feed entry during a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    Processed { url: String, article_id: i64, signal_id: i64, score: f64 },
    Degraded { url: String, article_id: i64 },
    Skipped { url: String, reason: SkipReason },
    Failed { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedReport {
    pub url: String,
    pub entries: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshCounts {
    pub processed: usize,
    pub degraded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub feeds_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshSummary {
    pub feeds: Vec<FeedReport>,
    pub outcomes: Vec<EntryOutcome>,
}

impl RefreshSummary {
    /// Number of articles that got a new signal in this run.
    pub fn processed(&self) -> usize {
        self.counts().processed
    }

    pub fn counts(&self) -> RefreshCounts {
        let mut counts = RefreshCounts {
            feeds_failed: self.feeds.iter().filter(|f| f.error.is_some()).count(),
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match outcome {
                EntryOutcome::Processed { .. } => counts.processed += 1,
                EntryOutcome::Degraded { .. } => counts.degraded += 1,
                EntryOutcome::Skipped { .. } => counts.skipped += 1,
                EntryOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }
}

/// Features, events and score computed for one text.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub features: FeatureBundle,
    pub events: EventSet,
    pub score: f64,
}

impl Assessment {
    fn into_signal(self, article_id: i64) -> NewSignal {
        let (sentiment_label, sentiment_score) = match self.features.top_sentiment() {
            Some(top) => (top.label.clone(), top.score),
            None => (NO_SENTIMENT_LABEL.to_string(), 0.0),
        };
        NewSignal {
            article_id,
            sentiment_label,
            sentiment_score,
            events: self.events,
            score: self.score,
        }
    }
}

/// Feed → article → features → events → score → signal.
///
/// Per-feed and per-entry failures are contained in the returned summary;
/// storage failures abort the run.
#[derive(Clone)]
pub struct SignalPipeline {
    storage: Arc<dyn SignalStorage>,
    feeds: Arc<dyn FeedSource>,
    articles: Arc<dyn ArticleSource>,
    extractor: FeatureExtractor,
    classifier: EventClassifier,
    scorer: Scorer,
    config: PipelineConfig,
}

impl SignalPipeline {
    pub fn new(
        storage: Arc<dyn SignalStorage>,
        feeds: Arc<dyn FeedSource>,
        articles: Arc<dyn ArticleSource>,
        extractor: FeatureExtractor,
    ) -> Self {
        Self {
            storage,
            feeds,
            articles,
            extractor,
            classifier: EventClassifier::default(),
            scorer: Scorer::default(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: EventClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<dyn SignalStorage> {
        self.storage.clone()
    }

    /// Pulls every configured feed and scores the entries not seen before.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();
        let logger = Logger::new().with_prefix("[refresh]".to_string());

        for feed_url in &self.config.feed_urls {
            let log = logger.clone().with_prefix(format!("[{}]", feed_url));
            let entries = match self.feeds.fetch_feed(feed_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    log.warn(&format!("⚠️ feed skipped: {}", e));
                    summary.feeds.push(FeedReport {
                        url: feed_url.clone(),
                        entries: 0,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            log.info(&format!("📰 {} entries", entries.len()));
            summary.feeds.push(FeedReport {
                url: feed_url.clone(),
                entries: entries.len(),
                error: None,
            });

            for entry in &entries {
                let outcome = self.process_entry(entry).await?;
                match &outcome {
                    EntryOutcome::Processed { url, score, .. } => {
                        log.info(&format!("✅ {} scored {:.3}", url, score))
                    }
                    EntryOutcome::Degraded { url, .. } => log.warn(&format!("🕳️ {} has no readable text", url)),
                    EntryOutcome::Skipped { url, reason } => log.debug(&format!("⏭️ {} skipped ({:?})", url, reason)),
                    EntryOutcome::Failed { url, reason } => log.warn(&format!("❌ {}: {}", url, reason)),
                }
                summary.outcomes.push(outcome);
            }
        }

        let counts = summary.counts();
        logger.info(&format!(
            "✨ done: {} processed, {} degraded, {} skipped, {} failed, {} feeds unavailable",
            counts.processed, counts.degraded, counts.skipped, counts.failed, counts.feeds_failed
        ));
        Ok(summary)
    }

    async fn process_entry(&self, entry: &FeedEntry) -> Result<EntryOutcome> {
        let url = entry.link.clone();
        if self.storage.find_article_by_url(&url).await?.is_some() {
            return Ok(EntryOutcome::Skipped { url, reason: SkipReason::AlreadyStored });
        }

        let content = match self.articles.fetch_article(&url).await {
            Ok(content) => content,
            Err(e) => return Ok(EntryOutcome::Failed { url, reason: e.to_string() }),
        };
        let degraded = content.is_degraded();

        let mut fields = NewArticle::from(content);
        fields.url = url.clone();
        if fields.title.is_empty() {
            fields.title = entry.title.clone();
        }
        if fields.published_at.is_none() {
            fields.published_at = entry.published;
        }

        let article = match self.storage.create_article(fields).await? {
            CreateOutcome::Created(article) => article,
            CreateOutcome::AlreadyExists => {
                return Ok(EntryOutcome::Skipped { url, reason: SkipReason::LostRace })
            }
        };

        if degraded && !self.config.score_empty_articles {
            return Ok(EntryOutcome::Degraded { url, article_id: article.id });
        }

        let assessment = match self.assess(&article.text).await {
            Ok(assessment) => assessment,
            Err(e) => return Ok(EntryOutcome::Failed { url, reason: e.to_string() }),
        };
        let signal = self.storage.create_signal(assessment.into_signal(article.id)).await?;
        Ok(EntryOutcome::Processed {
            url,
            article_id: article.id,
            signal_id: signal.id,
            score: signal.score,
        })
    }

    /// Runs extraction, classification and scoring over `text`.
    pub async fn assess(&self, text: &str) -> Result<Assessment> {
        let features = self.extractor.extract(text).await?;
        let events = self.classifier.classify(text);
        let score = self.scorer.score(features.top_sentiment(), &events);
        Ok(Assessment { features, events, score })
    }

    /// Scores a stored article again and stores the result as a new signal.
    ///
    /// Fails with `Error::NotFound` when no article has that id.
    pub async fn reprocess(&self, article_id: i64) -> Result<Signal> {
        let article: Article = self
            .storage
            .get_article(article_id)
            .await?
            .ok_or(Error::NotFound(article_id))?;
        let assessment = self.assess(&article.text).await?;
        let signal = self.storage.create_signal(assessment.into_signal(article.id)).await?;
        Logger::new()
            .with_prefix("[reprocess]".to_string())
            .info(&format!("🔄 article {} scored {:.3} (signal {})", article.id, signal.score, signal.id));
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{pipeline_with, FailingSentiment, RacingStorage, StaticArticles, StaticFeeds};

    #[tokio::test]
    async fn test_outcomes_for_each_entry_kind() {
        let feeds = StaticFeeds::new()
            .with_feed("https://feeds.example/a", &["https://news.example/1", "https://news.example/2", "https://news.example/3"]);
        let articles = StaticArticles::new()
            .with_page("https://news.example/1", "Die Behörde prüft die Übernahme.")
            .with_page("https://news.example/2", "   ");
        let (pipeline, _) = pipeline_with(feeds, articles, &["https://feeds.example/a", "https://feeds.example/missing"]);

        let summary = pipeline.refresh().await.unwrap();

        assert_eq!(summary.outcomes.len(), 3);
        assert!(matches!(summary.outcomes[0], EntryOutcome::Processed { article_id: 1, .. }));
        assert!(matches!(summary.outcomes[1], EntryOutcome::Degraded { article_id: 2, .. }));
        assert!(matches!(summary.outcomes[2], EntryOutcome::Failed { .. }));
        assert_eq!(
            summary.counts(),
            RefreshCounts { processed: 1, degraded: 1, skipped: 0, failed: 1, feeds_failed: 1 }
        );
        assert_eq!(summary.feeds[1].url, "https://feeds.example/missing");
        assert!(summary.feeds[1].error.is_some());
    }

    #[tokio::test]
    async fn test_feed_title_fills_missing_article_title() {
        let feeds = StaticFeeds::new().with_feed("https://feeds.example/a", &["https://news.example/1"]);
        let articles = StaticArticles::new().with_page("https://news.example/1", "Dividend raised.");
        let (pipeline, storage) = pipeline_with(feeds, articles, &["https://feeds.example/a"]);

        pipeline.refresh().await.unwrap();

        let article = storage.get_article(1).await.unwrap().unwrap();
        assert_eq!(article.title, "Entry https://news.example/1");
        assert_eq!(article.url, "https://news.example/1");
    }

    #[tokio::test]
    async fn test_score_empty_articles_when_configured() {
        let feeds = StaticFeeds::new().with_feed("https://feeds.example/a", &["https://news.example/empty"]);
        let articles = StaticArticles::new().with_page("https://news.example/empty", "");
        let (pipeline, storage) = pipeline_with(feeds, articles, &["https://feeds.example/a"]);
        let pipeline = pipeline.with_config(PipelineConfig {
            feed_urls: vec!["https://feeds.example/a".to_string()],
            score_empty_articles: true,
        });

        let summary = pipeline.refresh().await.unwrap();
        assert_eq!(summary.processed(), 1);

        let signals = storage.list_signals(10, 0).await.unwrap();
        assert_eq!(signals[0].signal.sentiment_label, NO_SENTIMENT_LABEL);
        assert_eq!(signals[0].signal.sentiment_score, 0.0);
        assert!(signals[0].signal.events.is_empty());
        assert_eq!(signals[0].signal.score, 0.0);
    }

    #[tokio::test]
    async fn test_inference_failure_is_contained() {
        let feeds = StaticFeeds::new().with_feed("https://feeds.example/a", &["https://news.example/1"]);
        let articles = StaticArticles::new().with_page("https://news.example/1", "Merger talks resumed.");
        let (pipeline, storage) = pipeline_with(feeds, articles, &["https://feeds.example/a"]);
        let pipeline = pipeline_with_sentiment(pipeline, Arc::new(FailingSentiment));

        let summary = pipeline.refresh().await.unwrap();

        assert_eq!(summary.counts().failed, 1);
        assert!(storage.find_article_by_url("https://news.example/1").await.unwrap().is_some());
        assert!(storage.list_signals(10, 0).await.unwrap().is_empty());
        assert!(matches!(pipeline.reprocess(1).await, Err(Error::Inference(_))));
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_skipped_and_run_continues() {
        let feeds = StaticFeeds::new()
            .with_feed("https://feeds.example/a", &["https://news.example/1", "https://news.example/2"]);
        let articles = Arc::new(
            StaticArticles::new()
                .with_page("https://news.example/1", "Rates were cut.")
                .with_page("https://news.example/2", "The merger closed."),
        );
        let storage: Arc<dyn SignalStorage> = Arc::new(RacingStorage::new("https://news.example/1"));
        let (pipeline, _) = pipeline_with(feeds, StaticArticles::new(), &["https://feeds.example/a"]);
        let pipeline = SignalPipeline {
            storage: storage.clone(),
            articles: articles.clone(),
            ..pipeline
        };

        let summary = pipeline.refresh().await.unwrap();

        assert_eq!(
            summary.outcomes[0],
            EntryOutcome::Skipped {
                url: "https://news.example/1".to_string(),
                reason: SkipReason::LostRace,
            }
        );
        assert!(matches!(summary.outcomes[1], EntryOutcome::Processed { .. }));
        assert_eq!(*articles.fetched.lock().unwrap(), vec!["https://news.example/1", "https://news.example/2"]);

        let signals = storage.list_signals(10, 0).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].article.url, "https://news.example/2");
    }

    #[tokio::test]
    async fn test_assess_uses_classifier_and_scorer() {
        let (pipeline, _) = pipeline_with(StaticFeeds::new(), StaticArticles::new(), &[]);
        let assessment = pipeline.assess("Profit warning: shares plunged after the merger collapsed.").await.unwrap();

        assert_eq!(assessment.events.as_slice(), &["earnings warning".to_string(), "merger".to_string()]);
        let top = assessment.features.top_sentiment().unwrap();
        assert_eq!(top.label, "negative");
        let expected = top.score + 2.0 + 1.5;
        assert!((assessment.score - expected).abs() < 1e-9);
    }

    fn pipeline_with_sentiment(
        pipeline: SignalPipeline,
        sentiment: Arc<dyn es_core::SentimentModel>,
    ) -> SignalPipeline {
        let linguist = Arc::new(es_inference::models::RuleBasedLinguist::load(None).unwrap());
        let models = Arc::new(es_inference::ModelProvider::new(linguist, sentiment));
        SignalPipeline {
            extractor: FeatureExtractor::new(models),
            ..pipeline
        }
    }
}
