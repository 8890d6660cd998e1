use scholar::pipeline::ResearchPipeline;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResearchPipeline>,
}

impl AppState {
    pub fn new(pipeline: ResearchPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
