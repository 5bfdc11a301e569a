use es_core::{Error, LinguisticModel, Result, SentimentModel};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod lexicon;
pub mod linguistic;
pub mod remote;

pub use lexicon::{Lexicon, LexiconSentimentModel};
pub use linguistic::RuleBasedLinguist;
pub use remote::HttpSentimentModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SentimentBackend {
    #[default]
    Lexicon,
    Http,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub sentiment_backend: SentimentBackend,
    pub lexicon_path: Option<PathBuf>,
    pub sentiment_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub gazetteer_path: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sentiment_backend: SentimentBackend::Lexicon,
            lexicon_path: None,
            sentiment_url: None,
            api_token: None,
            request_timeout: Duration::from_secs(30),
            gazetteer_path: None,
        }
    }
}

/// Owns the loaded linguistic and sentiment models for the lifetime of the process.
///
/// Built once by the binary and shared behind an `Arc`; models are read-only
/// after construction.
pub struct ModelProvider {
    linguistic: Arc<dyn LinguisticModel>,
    sentiment: Arc<dyn SentimentModel>,
}

impl fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelProvider")
            .field("linguistic", &self.linguistic.name())
            .field("sentiment", &self.sentiment.name())
            .finish()
    }
}

impl ModelProvider {
    pub fn new(linguistic: Arc<dyn LinguisticModel>, sentiment: Arc<dyn SentimentModel>) -> Self {
        Self { linguistic, sentiment }
    }

    /// Loads both models; any failure is `Error::ModelUnavailable`.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let linguistic = Arc::new(RuleBasedLinguist::load(config.gazetteer_path.as_deref())?);
        let sentiment = create_sentiment_model(config)?;
        let provider = Self::new(linguistic, sentiment);
        info!(
            "🧠 Models loaded (linguistic: {}, sentiment: {})",
            provider.linguistic.name(),
            provider.sentiment.name()
        );
        Ok(provider)
    }

    pub fn linguistic(&self) -> &dyn LinguisticModel {
        self.linguistic.as_ref()
    }

    pub fn sentiment(&self) -> &dyn SentimentModel {
        self.sentiment.as_ref()
    }
}

pub fn create_sentiment_model(config: &ModelConfig) -> Result<Arc<dyn SentimentModel>> {
    match config.sentiment_backend {
        SentimentBackend::Lexicon => Ok(Arc::new(LexiconSentimentModel::load(config.lexicon_path.as_deref())?)),
        SentimentBackend::Http => {
            let url = config.sentiment_url.as_deref().ok_or_else(|| {
                Error::ModelUnavailable("the http sentiment backend needs a sentiment URL".to_string())
            })?;
            Ok(Arc::new(HttpSentimentModel::new(url, config.api_token.clone(), config.request_timeout)?))
        }
    }
}
