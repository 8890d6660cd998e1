use bytes::Bytes;
use futures::{Stream, StreamExt};
use thiserror::Error;

use super::framing::{strip_channel, LineBuffer};
use super::record::StreamRecord;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Line is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Malformed record payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns a chunked response body into records, in a single pass
///
/// Lines that are blank or written on another channel are ignored. A malformed line
/// is logged and skipped; decoding carries on with the next one.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body, returning the records it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        self.lines
            .push(chunk)
            .into_iter()
            .filter_map(decode_line)
            .collect()
    }

    /// Decode a final line the body ended without terminating
    pub fn finish(&mut self) -> Option<StreamRecord> {
        self.lines.finish().and_then(decode_line)
    }
}

fn decode_line(line: Vec<u8>) -> Option<StreamRecord> {
    match parse_line(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Skipping undecodable stream line: {}", e);
            None
        }
    }
}

fn parse_line(line: Vec<u8>) -> Result<Option<StreamRecord>, DecodeError> {
    let line = String::from_utf8(line)?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    match strip_channel(&line) {
        Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
        None => {
            tracing::debug!("Ignoring line on another channel: {}", line);
            Ok(None)
        }
    }
}

/// Adapt a byte stream (such as an http response body) into a stream of records
///
/// A transport error is passed through and ends the stream.
pub fn decode_stream<S, E>(body: S) -> impl Stream<Item = Result<StreamRecord, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    async_stream::stream! {
        let mut decoder = StreamDecoder::new();
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    for record in decoder.push(&chunk) {
                        yield Ok(record);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(record) = decoder.finish() {
            yield Ok(record);
        }
    }
}
