use anyhow::{anyhow, Result};
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::protocol::framing::LineBuffer;

/// Turn a non-success response into an error carrying the provider's explanation
pub async fn check_response(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(anyhow!("Server error: {}", status))
        }
        status => {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!("Request failed: {} - {}", status, error_text))
        }
    }
}

/// Extract the JSON payload of a server-sent-events line, if it carries one
///
/// Returns `None` for comments, other fields and the `[DONE]` terminator.
pub fn parse_sse_data(line: &str) -> Option<Result<Value>> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(serde_json::from_str(data).map_err(|e| anyhow!("Invalid event payload: {}", e)))
}

/// Read a server-sent-events body as a stream of JSON payloads
pub fn sse_events(response: Response) -> BoxStream<'static, Result<Value>> {
    let body = response.bytes_stream();

    async_stream::try_stream! {
        let mut lines = LineBuffer::new();
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                let line = String::from_utf8(line)?;
                if let Some(event) = parse_sse_data(&line) {
                    yield event?;
                }
            }
        }

        if let Some(line) = lines.finish() {
            let line = String::from_utf8(line)?;
            if let Some(event) = parse_sse_data(&line) {
                yield event?;
            }
        }
    }
    .boxed()
}
