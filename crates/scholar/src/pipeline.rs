//! The research pipeline: optional document analysis, then research, review and a
//! streamed synthesis, each a single model call fed by the outputs before it.
pub mod driver;
pub mod prompts;
pub mod sources;

pub use driver::{RecordSink, ResearchPipeline, StageStatus, FAILURE_MESSAGE};
pub use prompts::PromptSet;
