use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Feed unavailable: {url}: {reason}")]
    FeedUnavailable { url: String, reason: String },

    #[error("Fetch error for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Article not found: {0}")]
    NotFound(i64),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let server = Error::Status { url: "http://a".into(), status: 503 };
        let throttled = Error::Status { url: "http://a".into(), status: 429 };
        let missing = Error::Status { url: "http://a".into(), status: 404 };
        assert!(server.is_transient());
        assert!(throttled.is_transient());
        assert!(!missing.is_transient());
        assert!(!Error::NotFound(3).is_transient());
    }
}
