use es_core::{Error, EventSet, Result, SentimentScore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Weight tables for the alarm score. Higher scores are more alarming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub sentiment: HashMap<String, f64>,
    pub events: HashMap<String, f64>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        let sentiment = [("positive", -1.0), ("neutral", 0.0), ("negative", 1.0)];
        let events = [
            ("earnings warning", 2.0),
            ("merger", 1.5),
            ("regulation", 1.0),
            ("dividend", -0.5),
        ];
        Self {
            sentiment: sentiment.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            events: events.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

impl ScoringWeights {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let weights: ScoringWeights = serde_json::from_str(&raw)?;
        weights.validated()
    }

    fn validated(self) -> Result<Self> {
        let bad = self
            .sentiment
            .iter()
            .chain(self.events.iter())
            .find(|(_, w)| !w.is_finite());
        if let Some((key, weight)) = bad {
            return Err(Error::Config(format!("weight for {:?} is not finite: {}", key, weight)));
        }
        let sentiment = self
            .sentiment
            .into_iter()
            .map(|(label, w)| (label.to_lowercase(), w))
            .collect();
        Ok(Self { sentiment, events: self.events })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Sentiment weight × confidence plus the weight of every detected event.
    ///
    /// Unknown labels and categories weigh 0; an absent sentiment contributes 0.
    pub fn score(&self, top: Option<&SentimentScore>, events: &EventSet) -> f64 {
        let mut score = 0.0;
        if let Some(top) = top {
            let weight = self
                .weights
                .sentiment
                .get(&top.label.to_lowercase())
                .copied()
                .unwrap_or(0.0);
            score += weight * top.score;
        }
        for event in events.iter() {
            score += self.weights.events.get(event).copied().unwrap_or(0.0);
        }
        score
    }
}

/// Scores a ranked sentiment list and events with the built-in weights.
pub fn heuristic_score(sentiment: &[SentimentScore], events: &EventSet) -> f64 {
    Scorer::default().score(sentiment.first(), events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_score() {
        let sentiment = vec![SentimentScore::new("negative", 0.9)];
        let events: EventSet = ["earnings warning"].into_iter().collect();
        let score = heuristic_score(&sentiment, &events);
        // 1.0 * 0.9 + 2.0
        assert!((score - 2.9).abs() < 0.001);
    }

    #[test]
    fn test_score_is_reproducible() {
        let sentiment = vec![SentimentScore::new("Positive", 0.37), SentimentScore::new("neutral", 0.33)];
        let events: EventSet = ["merger", "dividend", "regulation"].into_iter().collect();
        let first = heuristic_score(&sentiment, &events);
        let second = heuristic_score(&sentiment, &events);
        assert_eq!(first.to_bits(), second.to_bits());
        assert!((first - (-0.37 + 1.5 - 0.5 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_inputs_weigh_nothing() {
        let events: EventSet = ["volcano"].into_iter().collect();
        assert_eq!(heuristic_score(&[SentimentScore::new("negative", 0.5)], &events), 0.5);
        assert_eq!(heuristic_score(&[SentimentScore::new("bullish", 0.9)], &EventSet::new()), 0.0);
    }

    #[test]
    fn test_absent_sentiment_contributes_zero() {
        assert_eq!(heuristic_score(&[], &EventSet::new()), 0.0);
        let events: EventSet = ["dividend"].into_iter().collect();
        assert_eq!(heuristic_score(&[], &events), -0.5);
    }

    #[test]
    fn test_weights_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        std::fs::write(
            &path,
            r#"{"sentiment": {"NEGATIVE": 2.0}, "events": {"merger": 0.25}}"#,
        )
        .unwrap();

        let scorer = Scorer::new(ScoringWeights::from_file(&path).unwrap());
        let events: EventSet = ["merger"].into_iter().collect();
        assert_eq!(scorer.score(Some(&SentimentScore::new("negative", 0.5)), &events), 1.25);
    }
}
