use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Attachment, GenerateRequest, Generation, Provider, TextStream};
use super::configs::OpenAiProviderConfig;
use super::utils::{check_response, sse_events};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";

/// A provider for OpenAI compatible chat completion endpoints
///
/// These endpoints have no built-in web search, so answers never carry grounding
/// metadata and `web_search` requests are served from the model's own knowledge.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, request: &GenerateRequest, stream: bool) -> Value {
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(json!({
                "role": "system",
                "content": request.system
            }));
        }
        messages.push(json!({
            "role": "user",
            "content": user_content(request)
        }));

        let mut payload = serde_json::Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("messages".to_string(), json!(messages));

        if stream {
            payload.insert("stream".to_string(), json!(true));
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload.insert("max_tokens".to_string(), json!(tokens));
        }

        Value::Object(payload)
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        check_response(response).await
    }
}

/// The prompt followed by every attachment; text files are inlined, others named
fn user_content(request: &GenerateRequest) -> String {
    let mut content = request.prompt.clone();
    for attachment in &request.attachments {
        content.push_str("\n\n");
        content.push_str(&describe_attachment(attachment));
    }
    content
}

fn describe_attachment(attachment: &Attachment) -> String {
    let text = STANDARD
        .decode(&attachment.data)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|_| attachment.media_type.starts_with("text/"));

    match text {
        Some(text) => format!("[File: {}]\n{}", attachment.name, text),
        None => format!("[File: {}]", attachment.name),
    }
}

fn check_api_error(response: &Value) -> Result<()> {
    match response.get("error") {
        Some(error) => Err(anyhow!("OpenAI API error: {}", error)),
        None => Ok(()),
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation> {
        let response: Value = self
            .post(&self.payload(request, false))
            .await?
            .json()
            .await?;
        check_api_error(&response)?;

        let text = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid response format from OpenAI API"))?;

        Ok(Generation::text(text))
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream> {
        let response = self.post(&self.payload(request, true)).await?;

        let fragments = sse_events(response).filter_map(|event| async move {
            match event {
                Ok(event) => match check_api_error(&event) {
                    Ok(()) => event["choices"][0]["delta"]["content"]
                        .as_str()
                        .filter(|text| !text.is_empty())
                        .map(|text| Ok(text.to_string())),
                    Err(e) => Some(Err(e)),
                },
                Err(e) => Some(Err(e)),
            }
        });

        Ok(fragments.boxed())
    }
}
