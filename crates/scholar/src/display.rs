//! The ordered list of entries a chat surface draws, and the reducer that folds
//! stream records into it.
//!
//! Nothing here touches a terminal or a browser: the list is a plain container, so
//! every transition can be exercised synchronously.
use crate::models::message::{Message, Role};
use crate::protocol::record::StreamRecord;

/// Shown in place of an answer when the request itself could not be completed
pub const TRANSPORT_FAILURE_NOTICE: &str = "Failed to process your request. Please try again.";

const FAILURE_GLYPH: &str = "❌";

/// A progress indicator, removed as soon as the run terminates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEntry {
    Status(StatusEntry),
    Message(Message),
}

impl DisplayEntry {
    pub fn id(&self) -> &str {
        match self {
            DisplayEntry::Status(status) => &status.id,
            DisplayEntry::Message(message) => &message.id,
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, DisplayEntry::Status(_))
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            DisplayEntry::Message(message) => Some(message),
            _ => None,
        }
    }
}

/// The assistant answer being assembled during one pipeline run
///
/// The id is fixed when the run begins, so every fragment updates the same entry.
#[derive(Debug, Clone)]
pub struct Reply {
    id: String,
    text: String,
}

impl Reply {
    pub fn new() -> Self {
        Self {
            id: format!("assistant-{}", uuid::Uuid::new_v4()),
            text: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn message(&self) -> Message {
        Message::assistant()
            .with_id(self.id.clone())
            .with_text(self.text.clone())
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<DisplayEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(DisplayEntry::as_message)
    }

    pub fn statuses(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            DisplayEntry::Status(status) => Some(status),
            _ => None,
        })
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages().find(|message| message.id == id)
    }

    /// Append a message the user submitted
    pub fn push_user(&mut self, message: Message) {
        self.entries.push(DisplayEntry::Message(message));
    }

    /// Insert a message, or replace the entry that already carries its id in place
    pub fn upsert(&mut self, message: Message) {
        let existing = self
            .entries
            .iter_mut()
            .find(|entry| matches!(entry, DisplayEntry::Message(m) if m.id == message.id));

        match existing {
            Some(entry) => *entry = DisplayEntry::Message(message),
            None => self.entries.push(DisplayEntry::Message(message)),
        }
    }

    pub fn clear_statuses(&mut self) {
        self.entries.retain(|entry| !entry.is_status());
    }

    /// Fold one record into the list
    pub fn apply(&mut self, reply: &mut Reply, record: StreamRecord) {
        match record {
            StreamRecord::Status(content) => {
                self.entries.push(DisplayEntry::Status(StatusEntry {
                    id: format!("status-{}", uuid::Uuid::new_v4()),
                    content,
                }));
            }
            StreamRecord::TextDelta(fragment) => {
                reply.text.push_str(&fragment);
                self.upsert(reply.message());
            }
            StreamRecord::Finish => self.clear_statuses(),
            StreamRecord::Error(content) => self.push_failure(&content),
        }
    }

    /// Record a failure that happened outside the stream, such as a dropped connection
    pub fn fail(&mut self, notice: &str) {
        self.push_failure(notice);
    }

    // A failure ends the run, so its progress chips go with it
    fn push_failure(&mut self, notice: &str) {
        self.clear_statuses();
        self.entries.push(DisplayEntry::Message(
            Message::assistant().with_text(format!("{} {}", FAILURE_GLYPH, notice)),
        ));
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages()
            .filter(|message| message.role == Role::Assistant)
            .last()
    }
}
