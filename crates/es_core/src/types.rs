use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item read from an RSS or Atom feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub summary: String,
}

/// Article page after retrieval and extraction.
///
/// `text` and `title` are empty strings when the page could be downloaded but
/// not parsed into readable content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub url: String,
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    pub publish_date: Option<DateTime<Utc>>,
}

impl ArticleContent {
    pub fn is_degraded(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Fields of an article that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub authors: Vec<String>,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<ArticleContent> for NewArticle {
    fn from(content: ArticleContent) -> Self {
        Self {
            url: content.url,
            title: content.title,
            authors: content.authors,
            text: content.text,
            published_at: content.publish_date,
        }
    }
}

/// Stored article. `url` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub authors: Vec<String>,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Result of inserting an article under the URL uniqueness constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Article),
    AlreadyExists,
}

/// Ordered set of detected event categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSet(Vec<String>);

impl EventSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a category, keeping the first position if it is already present.
    pub fn insert(&mut self, category: impl Into<String>) -> bool {
        let category = category.into();
        if self.0.contains(&category) {
            return false;
        }
        self.0.push(category);
        true
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.iter().any(|c| c == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for EventSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = EventSet::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

/// One ranked output of the sentiment classifier. `score` is the confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: String,
    pub score: f64,
}

impl SentimentScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self { label: label.into(), score }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

/// Linguistic features of one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureBundle {
    pub tokens: Vec<String>,
    pub sentences: Vec<String>,
    pub entities: Vec<Entity>,
    /// Ranked best first.
    pub sentiment: Vec<SentimentScore>,
}

impl FeatureBundle {
    pub fn top_sentiment(&self) -> Option<&SentimentScore> {
        self.sentiment.first()
    }
}

/// Values for a signal row before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSignal {
    pub article_id: i64,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub events: EventSet,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: i64,
    pub article_id: i64,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub events: EventSet,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// A signal joined with the article it refers to, as served by the read surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalView {
    #[serde(flatten)]
    pub signal: Signal,
    pub article: Article,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_set_rejects_duplicates() {
        let mut events = EventSet::new();
        assert!(events.insert("merger"));
        assert!(events.insert("dividend"));
        assert!(!events.insert("merger"));
        assert_eq!(events.as_slice(), &["merger".to_string(), "dividend".to_string()]);
    }

    #[test]
    fn test_event_set_serializes_as_list() {
        let events: EventSet = ["merger", "regulation"].into_iter().collect();
        let json = serde_json::to_string(&events).unwrap();
        assert_eq!(json, r#"["merger","regulation"]"#);
    }

    #[test]
    fn test_degraded_content() {
        let content = ArticleContent {
            url: "https://example.com/a".to_string(),
            text: "  \n".to_string(),
            ..Default::default()
        };
        assert!(content.is_degraded());
    }
}
