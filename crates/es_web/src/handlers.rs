use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use es_core::{Signal, SignalView};
use es_ingest::{FeedReport, Job, JobStatus, RefreshCounts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    #[serde(flatten)]
    pub counts: RefreshCounts,
    pub feeds: Vec<FeedReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> ApiResult<Json<RefreshResponse>> {
    let summary = state.pipeline.refresh().await?;
    Ok(Json(RefreshResponse {
        counts: summary.counts(),
        feeds: summary.feeds,
    }))
}

pub async fn process_article(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> ApiResult<Json<Signal>> {
    Ok(Json(state.pipeline.reprocess(article_id).await?))
}

pub async fn list_signals(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<SignalView>>> {
    Ok(Json(state.storage().list_signals(page.limit, page.offset).await?))
}

pub async fn submit_refresh(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let job_id = state.worker.submit(Job::Refresh).await?;
    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

pub async fn submit_process(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let job_id = state.worker.submit(Job::Reprocess { article_id }).await?;
    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatus>> {
    state
        .worker
        .status(job_id)
        .await
        .map(Json)
        .ok_or(ApiError::UnknownJob(job_id))
}
