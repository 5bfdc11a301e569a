pub mod feed;
pub mod fetcher;
pub mod http;
pub mod jsonld;
pub mod logging;
#[cfg(test)]
mod mocks;
pub mod pipeline;
pub mod retry;
pub mod worker;

pub use feed::FeedReader;
pub use fetcher::ArticleFetcher;
pub use http::FetcherConfig;
pub use pipeline::{
    Assessment, EntryOutcome, FeedReport, PipelineConfig, RefreshCounts, RefreshSummary,
    SignalPipeline, SkipReason, DEFAULT_FEEDS, NO_SENTIMENT_LABEL,
};
pub use retry::RetryPolicy;
pub use worker::{Job, JobOutput, JobStatus, Worker, WorkerHandle};

pub mod prelude {
    pub use super::{ArticleFetcher, FeedReader, PipelineConfig, SignalPipeline};
    pub use es_core::{Article, Error, Result, Signal};
}
