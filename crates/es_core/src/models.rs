use async_trait::async_trait;
use crate::types::{Entity, SentimentScore};
use crate::Result;

/// Output of the general-purpose linguistic model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinguisticAnalysis {
    pub tokens: Vec<String>,
    pub sentences: Vec<String>,
    pub entities: Vec<Entity>,
}

pub trait LinguisticModel: Send + Sync {
    fn name(&self) -> &str;

    /// Tokenize, segment and tag entities in `text`
    fn analyze(&self, text: &str) -> LinguisticAnalysis;
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;

    /// Classify `text`, returning labels ranked by confidence, best first
    async fn classify(&self, text: &str) -> Result<Vec<SentimentScore>>;
}
