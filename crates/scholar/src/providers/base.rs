use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::models::message::FilePart;

/// A document sent to the model alongside the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    /// Base64 encoded content
    pub data: String,
}

impl From<&FilePart> for Attachment {
    fn from(file: &FilePart) -> Self {
        let (media_type, data) = file.inline_data();
        Self {
            name: file.filename.clone(),
            media_type,
            data,
        }
    }
}

/// Everything a provider needs for one model call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    /// Let the model ground its answer with web search
    pub web_search: bool,
}

impl GenerateRequest {
    pub fn new<S: Into<String>, P: Into<String>>(system: S, prompt: P) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default)]
    pub grounding_chunk_indices: Vec<usize>,
}

/// Which sources back the claims of a web-searched answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub web_search_queries: Option<Vec<String>>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupport>,
}

/// The complete answer of a non-streaming call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub grounding: Option<GroundingMetadata>,
}

impl Generation {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            grounding: None,
        }
    }

    pub fn with_grounding(mut self, grounding: GroundingMetadata) -> Self {
        self.grounding = Some(grounding);
        self
    }
}

/// Incremental text of a streaming call; lazy, finite and not restartable
pub type TextStream = BoxStream<'static, Result<String>>;

/// Base trait for model providers (Google, OpenAI, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a complete answer
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation>;

    /// Generate an answer as a sequence of text fragments
    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream>;
}
