use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One framed unit of the response stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord", into = "RawRecord")]
pub enum StreamRecord {
    /// Progress of the pipeline, shown until the run terminates
    Status(String),
    /// An incremental fragment of the final answer
    TextDelta(String),
    /// Terminal marker of a successful run
    Finish,
    /// Terminal marker of a failed run, with a user facing message
    Error(String),
}

impl StreamRecord {
    pub fn status<S: Into<String>>(message: S) -> Self {
        StreamRecord::Status(message.into())
    }

    pub fn text_delta<S: Into<String>>(fragment: S) -> Self {
        StreamRecord::TextDelta(fragment.into())
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        StreamRecord::Error(message.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamRecord::Finish | StreamRecord::Error(_))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RecordKind {
    Status,
    TextDelta,
    Finish,
    Error,
}

/// The JSON payload as written on the wire: `{"type": ..., "content": ...}`
#[derive(Debug, Serialize, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: RecordKind,
    #[serde(default)]
    content: Value,
}

impl TryFrom<RawRecord> for StreamRecord {
    type Error = String;

    fn try_from(raw: RawRecord) -> Result<Self, String> {
        // finish carries `"content": ""`, but any content is accepted when reading
        if let RecordKind::Finish = raw.kind {
            return Ok(StreamRecord::Finish);
        }

        let content = match raw.content {
            Value::String(content) => content,
            other => return Err(format!("expected string content, found {}", other)),
        };

        Ok(match raw.kind {
            RecordKind::Status => StreamRecord::Status(content),
            RecordKind::TextDelta => StreamRecord::TextDelta(content),
            RecordKind::Error => StreamRecord::Error(content),
            RecordKind::Finish => StreamRecord::Finish,
        })
    }
}

impl From<StreamRecord> for RawRecord {
    fn from(record: StreamRecord) -> Self {
        let (kind, content) = match record {
            StreamRecord::Status(content) => (RecordKind::Status, content),
            StreamRecord::TextDelta(content) => (RecordKind::TextDelta, content),
            StreamRecord::Finish => (RecordKind::Finish, String::new()),
            StreamRecord::Error(content) => (RecordKind::Error, content),
        };
        RawRecord {
            kind,
            content: Value::String(content),
        }
    }
}
