use es_core::SignalStorage;
use es_ingest::{SignalPipeline, WorkerHandle};
use std::sync::Arc;

pub struct AppState {
    pub pipeline: SignalPipeline,
    pub worker: WorkerHandle,
}

impl AppState {
    pub fn new(pipeline: SignalPipeline, worker: WorkerHandle) -> Self {
        Self { pipeline, worker }
    }

    pub fn storage(&self) -> Arc<dyn SignalStorage> {
        self.pipeline.storage()
    }
}
