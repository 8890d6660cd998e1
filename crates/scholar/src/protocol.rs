//! The status/text stream sent from the research pipeline to the chat client
//!
//! Every record is one line: a one character channel tag, a `:` separator and a JSON
//! payload, terminated by `\n`. The body is consumed in a single pass; there is no
//! resumption token and records are never replayed.
pub mod decoder;
pub mod framing;
pub mod record;

pub use decoder::{decode_stream, StreamDecoder};
pub use framing::{encode_record, LineBuffer};
pub use record::StreamRecord;

/// Header announcing the framing version of a response body
pub const STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const STREAM_VERSION: &str = "v1";

/// Channel tag every record is written on
pub const CHANNEL_TAG: char = '0';
