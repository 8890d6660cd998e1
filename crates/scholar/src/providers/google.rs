use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{GenerateRequest, Generation, GroundingMetadata, Provider, TextStream};
use super::configs::GoogleProviderConfig;
use super::utils::{check_response, sse_events};

pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GOOGLE_MODEL: &str = "gemini-2.5-flash";

pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.host.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    fn payload(&self, request: &GenerateRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        for attachment in &request.attachments {
            parts.push(json!({
                "inlineData": {
                    "mimeType": attachment.media_type,
                    "data": attachment.data,
                }
            }));
        }

        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            json!([{
                "role": "user",
                "parts": parts,
            }]),
        );

        if !request.system.is_empty() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": request.system }] }),
            );
        }
        if request.web_search {
            payload.insert("tools".to_string(), json!([{ "googleSearch": {} }]));
        }

        let mut generation_config = Map::new();
        if let Some(temp) = self.config.temperature {
            generation_config.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(tokens));
        }
        if !generation_config.is_empty() {
            payload.insert(
                "generationConfig".to_string(),
                Value::Object(generation_config),
            );
        }

        Value::Object(payload)
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(payload)
            .send()
            .await?;

        check_response(response).await
    }
}

/// Concatenate the text parts of the first candidate
fn candidate_text(response: &Value) -> String {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

fn candidate_grounding(response: &Value) -> Result<Option<GroundingMetadata>> {
    match response["candidates"][0].get("groundingMetadata") {
        Some(metadata) => Ok(Some(serde_json::from_value(metadata.clone())?)),
        None => Ok(None),
    }
}

fn check_api_error(response: &Value) -> Result<()> {
    match response.get("error") {
        Some(error) => Err(anyhow!("Google API error: {}", error)),
        None => Ok(()),
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation> {
        let payload = self.payload(request);
        let response: Value = self
            .post(&self.endpoint("generateContent"), &payload)
            .await?
            .json()
            .await?;
        check_api_error(&response)?;

        if response["candidates"].as_array().map_or(true, |c| c.is_empty()) {
            return Err(anyhow!("Google API returned no candidates: {}", response));
        }

        Ok(Generation {
            text: candidate_text(&response),
            grounding: candidate_grounding(&response)?,
        })
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TextStream> {
        let payload = self.payload(request);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, &payload).await?;

        let fragments = sse_events(response).filter_map(|event| async move {
            match event {
                Ok(event) => match check_api_error(&event) {
                    Ok(()) => {
                        let text = candidate_text(&event);
                        (!text.is_empty()).then_some(Ok(text))
                    }
                    Err(e) => Some(Err(e)),
                },
                Err(e) => Some(Err(e)),
            }
        });

        Ok(fragments.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::base::Attachment;
    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GoogleProvider {
        GoogleProvider::new(GoogleProviderConfig {
            host: server.uri(),
            api_key: "test_api_key".to_string(),
            model: GOOGLE_MODEL.to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_with_grounding() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test_api_key"))
            .and(body_partial_json(json!({
                "tools": [{"googleSearch": {}}],
                "systemInstruction": {"parts": [{"text": "You research."}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{"text": "Findings "}, {"text": "here."}]
                    },
                    "groundingMetadata": {
                        "webSearchQueries": ["ai climate"],
                        "groundingChunks": [{"web": {"uri": "https://a.example", "title": "A"}}],
                        "groundingSupports": [{"groundingChunkIndices": [0]}]
                    }
                }]
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let request = GenerateRequest::new("You research.", "AI for climate").with_web_search();
        let generation = provider.generate(&request).await?;

        assert_eq!(generation.text, "Findings here.");
        let grounding = generation.grounding.unwrap();
        assert_eq!(
            grounding.grounding_chunks[0].web.as_ref().unwrap().uri.as_deref(),
            Some("https://a.example")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_sends_attachments_inline() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Analyze"},
                        {"inlineData": {"mimeType": "application/pdf", "data": "JVBERi0="}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "## Document Summary"}]}}]
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let request = GenerateRequest::new("", "Analyze").with_attachments(vec![Attachment {
            name: "paper.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            data: "JVBERi0=".to_string(),
        }]);
        let generation = provider.generate(&request).await?;

        assert_eq!(generation.text, "## Document Summary");
        assert_eq!(generation.grounding, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let result = provider
            .generate(&GenerateRequest::new("system", "prompt"))
            .await;
        assert!(result.unwrap_err().to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_stream_fragments() -> Result<()> {
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"# Research\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" Insights\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let fragments: Vec<String> = provider
            .stream(&GenerateRequest::new("system", "prompt"))
            .await?
            .try_collect()
            .await?;

        assert_eq!(fragments, vec!["# Research", " Insights"]);

        Ok(())
    }
}
