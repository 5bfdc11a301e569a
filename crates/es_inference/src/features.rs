use es_core::{Error, FeatureBundle, Result};
use std::sync::Arc;
use crate::models::ModelProvider;

/// Character cap for the sentiment classifier input.
pub const DEFAULT_MAX_SENTIMENT_CHARS: usize = 512;

/// Runs the linguistic model over the whole text and the sentiment model
/// over its leading `max_sentiment_chars` characters.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    models: Arc<ModelProvider>,
    max_sentiment_chars: usize,
}

impl FeatureExtractor {
    pub fn new(models: Arc<ModelProvider>) -> Self {
        Self {
            models,
            max_sentiment_chars: DEFAULT_MAX_SENTIMENT_CHARS,
        }
    }

    pub fn with_max_sentiment_chars(mut self, max_chars: usize) -> Self {
        self.max_sentiment_chars = max_chars.max(1);
        self
    }

    pub fn max_sentiment_chars(&self) -> usize {
        self.max_sentiment_chars
    }

    pub async fn extract(&self, text: &str) -> Result<FeatureBundle> {
        if text.trim().is_empty() {
            return Ok(FeatureBundle::default());
        }

        let analysis = self.models.linguistic().analyze(text);
        let sentiment = self
            .models
            .sentiment()
            .classify(truncate_chars(text, self.max_sentiment_chars))
            .await?;
        if sentiment.is_empty() {
            return Err(Error::Inference(format!(
                "{} returned no sentiment labels",
                self.models.sentiment().name()
            )));
        }

        Ok(FeatureBundle {
            tokens: analysis.tokens,
            sentences: analysis.sentences,
            entities: analysis.entities,
            sentiment,
        })
    }
}

/// Leading `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use es_core::{SentimentModel, SentimentScore};
    use std::sync::Mutex;
    use crate::models::RuleBasedLinguist;

    /// Records the inputs it is asked to classify.
    #[derive(Default)]
    struct RecordingModel {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SentimentModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn classify(&self, text: &str) -> Result<Vec<SentimentScore>> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(vec![SentimentScore::new("neutral", 0.6), SentimentScore::new("negative", 0.4)])
        }
    }

    struct SilentModel;

    #[async_trait]
    impl SentimentModel for SilentModel {
        fn name(&self) -> &str {
            "silent"
        }

        async fn classify(&self, _text: &str) -> Result<Vec<SentimentScore>> {
            Ok(Vec::new())
        }
    }

    fn extractor_with(sentiment: Arc<dyn SentimentModel>) -> FeatureExtractor {
        let linguist = Arc::new(RuleBasedLinguist::load(None).unwrap());
        FeatureExtractor::new(Arc::new(ModelProvider::new(linguist, sentiment)))
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("übernahme", 2), "üb");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[tokio::test]
    async fn test_sentiment_sees_only_the_prefix() {
        let model = Arc::new(RecordingModel::default());
        let extractor = extractor_with(model.clone()).with_max_sentiment_chars(10);
        let text = "Inflation rose sharply again this quarter.";

        let bundle = extractor.extract(text).await.unwrap();

        assert_eq!(model.seen.lock().unwrap().as_slice(), &["Inflation ".to_string()]);
        assert_eq!(bundle.top_sentiment().unwrap().label, "neutral");
        assert_eq!(bundle.tokens.len(), 7);
        assert_eq!(bundle.sentences.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_skips_models() {
        let model = Arc::new(RecordingModel::default());
        let extractor = extractor_with(model.clone());

        let bundle = extractor.extract("   ").await.unwrap();

        assert_eq!(bundle, FeatureBundle::default());
        assert!(bundle.top_sentiment().is_none());
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_sentiment_output_is_an_error() {
        let extractor = extractor_with(Arc::new(SilentModel));
        let err = extractor.extract("Markets were calm.").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }
}
