use async_trait::async_trait;
use es_core::{Error, Result, SentimentModel, SentimentScore};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

const DEFAULT_LEXICON: &str = include_str!("../../data/finance_lexicon.json");

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";
pub const NEUTRAL: &str = "neutral";

/// Serialized form of a sentiment lexicon.
///
/// Single-word terms are matched against word tokens, multi-word terms
/// against the lower-cased text. Positive weights push towards `positive`,
/// negative weights towards `negative`.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    pub name: String,
    #[serde(default = "default_neutral_bias")]
    pub neutral_bias: f64,
    pub terms: HashMap<String, f64>,
}

fn default_neutral_bias() -> f64 {
    1.0
}

impl Lexicon {
    pub fn from_json(raw: &str) -> Result<Self> {
        let lexicon: Lexicon = serde_json::from_str(raw)
            .map_err(|e| Error::ModelUnavailable(format!("invalid lexicon: {}", e)))?;
        if lexicon.terms.is_empty() {
            return Err(Error::ModelUnavailable(format!("lexicon {} has no terms", lexicon.name)));
        }
        if lexicon.terms.values().any(|w| !w.is_finite()) || !lexicon.neutral_bias.is_finite() {
            return Err(Error::ModelUnavailable(format!(
                "lexicon {} contains non-finite weights",
                lexicon.name
            )));
        }
        Ok(lexicon)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelUnavailable(format!("cannot read lexicon {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }
}

/// Financial sentiment classifier backed by a weighted term lexicon.
pub struct LexiconSentimentModel {
    name: String,
    neutral_bias: f64,
    words: HashMap<String, f64>,
    phrases: Vec<(String, f64)>,
}

impl fmt::Debug for LexiconSentimentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexiconSentimentModel")
            .field("name", &self.name)
            .field("words", &self.words.len())
            .field("phrases", &self.phrases.len())
            .finish()
    }
}

impl LexiconSentimentModel {
    pub fn new(lexicon: Lexicon) -> Self {
        let mut words = HashMap::new();
        let mut phrases = Vec::new();
        for (term, weight) in lexicon.terms {
            let term = term.trim().to_lowercase();
            if term.contains(char::is_whitespace) {
                phrases.push((term, weight));
            } else {
                words.insert(term, weight);
            }
        }
        phrases.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            name: lexicon.name,
            neutral_bias: lexicon.neutral_bias,
            words,
            phrases,
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let lexicon = match path {
            Some(path) => Lexicon::from_file(path)?,
            None => Lexicon::from_json(DEFAULT_LEXICON)?,
        };
        Ok(Self::new(lexicon))
    }

    /// Accumulated positive and negative evidence for `text`.
    fn evidence(&self, text: &str) -> (f64, f64) {
        let lowered = text.to_lowercase();
        let mut positive = 0.0;
        let mut negative = 0.0;
        let mut add = |weight: f64| {
            if weight > 0.0 {
                positive += weight;
            } else {
                negative -= weight;
            }
        };

        for word in lowered.unicode_words() {
            if let Some(&weight) = self.words.get(word) {
                add(weight);
            }
        }
        for (phrase, weight) in &self.phrases {
            let hits = lowered.matches(phrase.as_str()).count();
            for _ in 0..hits {
                add(*weight);
            }
        }
        (positive, negative)
    }

    fn rank(&self, positive: f64, negative: f64) -> Vec<SentimentScore> {
        let logits = [
            (POSITIVE, positive),
            (NEGATIVE, negative),
            (NEUTRAL, self.neutral_bias),
        ];
        let max = logits.iter().map(|(_, l)| *l).fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = logits.iter().map(|(_, l)| (l - max).exp()).collect();
        let total: f64 = exp.iter().sum();

        let mut ranked: Vec<SentimentScore> = logits
            .iter()
            .zip(exp)
            .map(|((label, _), e)| SentimentScore::new(*label, e / total))
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

#[async_trait]
impl SentimentModel for LexiconSentimentModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, text: &str) -> Result<Vec<SentimentScore>> {
        let (positive, negative) = self.evidence(text);
        Ok(self.rank(positive, negative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_lexicon_loads() {
        let lexicon = Lexicon::from_json(DEFAULT_LEXICON).unwrap();
        assert_eq!(lexicon.name, "finance-lexicon-v1");
        assert!(lexicon.terms.contains_key("profit warning"));
    }

    #[test]
    fn test_rejects_empty_lexicon() {
        let err = Lexicon::from_json(r#"{"name": "x", "terms": {}}"#).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_missing_lexicon_file_is_model_unavailable() {
        let err = LexiconSentimentModel::load(Some(Path::new("/nonexistent/lexicon.json"))).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_unreadable_lexicon_does_not_fall_back() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{ not json").unwrap();
        let err = LexiconSentimentModel::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_negative_text_ranks_negative_first() {
        let model = LexiconSentimentModel::load(None).unwrap();
        let ranked = model
            .classify("Shares plunged after the company issued a profit warning amid recession fears.")
            .await
            .unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].label, NEGATIVE);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        let total: f64 = ranked.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_positive_text_ranks_positive_first() {
        let model = LexiconSentimentModel::load(None).unwrap();
        let ranked = model
            .classify("Exports surged and the economy showed robust growth and a strong recovery.")
            .await
            .unwrap();
        assert_eq!(ranked[0].label, POSITIVE);
        assert!(ranked[0].score > 0.5 && ranked[0].score <= 1.0);
    }

    #[tokio::test]
    async fn test_plain_text_is_neutral() {
        let model = LexiconSentimentModel::load(None).unwrap();
        let ranked = model.classify("The committee meets on Tuesday.").await.unwrap();
        assert_eq!(ranked[0].label, NEUTRAL);
    }

    #[tokio::test]
    async fn test_classification_is_deterministic() {
        let model = LexiconSentimentModel::load(None).unwrap();
        let text = "Losses widened while the outlook stayed weak.";
        let first = model.classify(text).await.unwrap();
        let second = model.classify(text).await.unwrap();
        assert_eq!(first, second);
    }
}
