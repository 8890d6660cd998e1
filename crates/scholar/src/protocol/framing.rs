use super::record::StreamRecord;
use super::CHANNEL_TAG;

/// Frame a record as one line of the response stream
pub fn encode_record(record: &StreamRecord) -> String {
    // A record only holds strings, so serialization cannot fail
    let payload = serde_json::to_string(record).unwrap_or_else(|_| String::from("{}"));
    format!("{}:{}\n", CHANNEL_TAG, payload)
}

/// Split the payload off a framed line, if it was written on our channel
pub fn strip_channel(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(tag), Some(':')) if tag == CHANNEL_TAG => Some(chars.as_str()),
        _ => None,
    }
}

/// Reassembles newline terminated lines from arbitrarily chunked bytes
///
/// Bytes after the last newline of a chunk are held back and prefixed onto the next
/// chunk, so a line (or a multi-byte character) split across reads comes out whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and take every line it completes, without the terminator
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
            .collect()
    }

    /// Take the unterminated remainder once the input has ended
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}
