use async_trait::async_trait;
use es_core::{Error, Result, SentimentModel, SentimentScore};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Nested(Vec<Vec<SentimentScore>>),
    Flat(Vec<SentimentScore>),
}

impl ClassifyResponse {
    fn into_scores(self) -> Vec<SentimentScore> {
        match self {
            ClassifyResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            ClassifyResponse::Flat(scores) => scores,
        }
    }
}

/// Sentiment classifier served over HTTP by a hosted text-classification endpoint.
pub struct HttpSentimentModel {
    client: Client,
    endpoint: Url,
    api_token: Option<String>,
}

impl fmt::Debug for HttpSentimentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSentimentModel")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_token", &self.api_token.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpSentimentModel {
    pub fn new(endpoint: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::ModelUnavailable(format!("invalid sentiment endpoint {}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ModelUnavailable(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint, api_token })
    }
}

/// Checks confidences and orders the labels best first.
pub(crate) fn normalize_scores(mut scores: Vec<SentimentScore>) -> Result<Vec<SentimentScore>> {
    if let Some(bad) = scores.iter().find(|s| !s.score.is_finite() || !(0.0..=1.0).contains(&s.score)) {
        return Err(Error::Inference(format!(
            "sentiment confidence out of range for {}: {}",
            bad.label, bad.score
        )));
    }
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    fn name(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn classify(&self, text: &str) -> Result<Vec<SentimentScore>> {
        let mut request = self.client.post(self.endpoint.clone()).json(&ClassifyRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "sentiment endpoint returned {}",
                response.status()
            )));
        }
        let body = response.json::<ClassifyResponse>().await?;
        normalize_scores(body.into_scores())
    }
}
