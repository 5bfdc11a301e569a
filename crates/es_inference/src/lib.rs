pub mod events;
pub mod features;
pub mod models;
pub mod scoring;

pub use events::{classify_events, EventClassifier, EventRule, EventRules};
pub use features::{FeatureExtractor, DEFAULT_MAX_SENTIMENT_CHARS};
pub use models::{ModelConfig, ModelProvider, SentimentBackend};
pub use scoring::{heuristic_score, Scorer, ScoringWeights};

pub mod prelude {
    pub use super::{EventClassifier, FeatureExtractor, ModelConfig, ModelProvider, Scorer};
    pub use es_core::{EventSet, FeatureBundle, Result, Error, SentimentScore};
}
