use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use es_core::Error;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

/// Errors surfaced to HTTP clients as a status code and `{"error": ...}` body.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(Error),
    UnknownJob(Uuid),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Pipeline(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownJob(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(Error::Config(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(Error::ModelUnavailable(_) | Error::Inference(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Pipeline(e) => e.to_string(),
            ApiError::UnknownJob(id) => format!("Job not found: {}", id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!("🔥 {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
