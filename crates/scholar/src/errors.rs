use strum_macros::Display;
use thiserror::Error;

/// One sequential unit of the research pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    DocumentAnalysis,
    Research,
    Review,
    Synthesis,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build the {stage} prompt: {source}")]
    Prompt {
        stage: Stage,
        #[source]
        source: tera::Error,
    },

    #[error("The {stage} stage failed: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("The client stopped reading the response stream")]
    Disconnected,
}

impl PipelineError {
    pub fn prompt(stage: Stage) -> impl FnOnce(tera::Error) -> Self {
        move |source| PipelineError::Prompt { stage, source }
    }

    pub fn provider(stage: Stage) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| PipelineError::Provider { stage, source }
    }

    /// The underlying failure, without the stage that wraps it
    pub fn cause(&self) -> String {
        match self {
            PipelineError::Prompt { source, .. } => source.to_string(),
            PipelineError::Provider { source, .. } => source.to_string(),
            PipelineError::Disconnected => self.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
