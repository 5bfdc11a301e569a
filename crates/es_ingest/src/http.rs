use crate::retry::RetryPolicy;
use es_core::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("economic-signals/", env!("CARGO_PKG_VERSION"));

/// HTTP settings shared by the feed reader and the article fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

pub(crate) fn build_client(config: &FetcherConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .build()?)
}

/// GETs `url` under the retry policy. Non-2xx answers become `Error::Status`.
pub(crate) async fn get_bytes(client: &Client, retry: &RetryPolicy, url: &str) -> Result<Vec<u8>> {
    retry
        .run(url, move || async move {
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().await?;
            debug!("⬇️ {} ({} bytes)", url, body.len());
            Ok(body.to_vec())
        })
        .await
}

/// Like [`get_bytes`] but decodes the body using the response charset.
pub(crate) async fn get_text(client: &Client, retry: &RetryPolicy, url: &str) -> Result<String> {
    retry
        .run(url, move || async move {
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let body = response.text().await?;
            debug!("⬇️ {} ({} bytes)", url, body.len());
            Ok(body)
        })
        .await
}
