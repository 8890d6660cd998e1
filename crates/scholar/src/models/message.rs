use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// An uploaded document carried inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    #[serde(alias = "name")]
    pub filename: String,
    pub media_type: String,
    /// Either a `data:<mime>;base64,<payload>` url or the raw text of the file
    #[serde(alias = "content")]
    pub url: String,
}

impl FilePart {
    pub fn new<S: Into<String>, T: Into<String>, U: Into<String>>(
        filename: S,
        media_type: T,
        url: U,
    ) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            url: url.into(),
        }
    }

    /// Build a file part from raw bytes, encoding them as a base64 data url
    pub fn from_bytes<S: Into<String>, T: Into<String>>(
        filename: S,
        media_type: T,
        bytes: &[u8],
    ) -> Self {
        let media_type = media_type.into();
        let url = format!("data:{};base64,{}", media_type, STANDARD.encode(bytes));
        Self::new(filename, media_type, url)
    }

    /// The media type and base64 payload of this file
    ///
    /// Data urls are split as-is. Anything else is treated as the literal
    /// file content and encoded with the part's declared media type.
    pub fn inline_data(&self) -> (String, String) {
        if let Some(rest) = self.url.strip_prefix("data:") {
            if let Some((header, payload)) = rest.split_once(',') {
                if let Some(mime) = header.strip_suffix(";base64") {
                    let mime = if mime.is_empty() {
                        self.media_type.clone()
                    } else {
                        mime.to_string()
                    };
                    return (mime, payload.to_string());
                }
            }
        }
        (self.media_type.clone(), STANDARD.encode(self.url.as_bytes()))
    }

    /// The decoded file content when it is valid utf-8 text
    pub fn text_content(&self) -> Option<String> {
        let (_, payload) = self.inline_data();
        let bytes = STANDARD.decode(payload).ok()?;
        String::from_utf8(bytes).ok()
    }
}

/// One ordered piece of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text { text: String },
    File(FilePart),
    /// Parts the chat surface keeps for itself, such as step markers
    #[serde(other)]
    Other,
}

impl Part {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FilePart> {
        match self {
            Part::File(file) => Some(file),
            _ => None,
        }
    }
}

/// A message to or from the research assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a new user message with a fresh id
    pub fn user() -> Self {
        Self::with_role(Role::User)
    }

    /// Create a new assistant message with a fresh id
    pub fn assistant() -> Self {
        Self::with_role(Role::Assistant)
    }

    fn with_role(role: Role) -> Self {
        let prefix = match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Message {
            id: format!("{}-{}", prefix, uuid::Uuid::new_v4()),
            role,
            parts: Vec::new(),
        }
    }

    /// Replace the id of the message
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// Add any part to the message
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_part(Part::text(text))
    }

    /// Add an uploaded file to the message
    pub fn with_file(self, file: FilePart) -> Self {
        self.with_part(Part::File(file))
    }

    /// The displayed text: every text part concatenated in order
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    /// The research topic: text parts joined by a single space
    pub fn topic(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn files(&self) -> Vec<&FilePart> {
        self.parts.iter().filter_map(Part::as_file).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_concatenates_in_order() {
        let message = Message::user()
            .with_text("AI for ")
            .with_file(FilePart::new("notes.txt", "text/plain", "hello"))
            .with_text("climate modeling");

        assert_eq!(message.text(), "AI for climate modeling");
        assert_eq!(message.topic(), "AI for  climate modeling");
        assert_eq!(message.files().len(), 1);
    }

    #[test]
    fn test_deserialize_client_message() {
        let value = json!({
            "id": "user-1",
            "role": "user",
            "parts": [
                {"type": "text", "text": "AI for climate modeling"},
                {
                    "type": "file",
                    "filename": "paper.pdf",
                    "mediaType": "application/pdf",
                    "url": "data:application/pdf;base64,JVBERi0="
                }
            ]
        });

        let message: Message = serde_json::from_value(value).unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.topic(), "AI for climate modeling");

        let file = message.files()[0];
        assert_eq!(file.filename, "paper.pdf");
        assert_eq!(
            file.inline_data(),
            ("application/pdf".to_string(), "JVBERi0=".to_string())
        );
    }

    #[test]
    fn test_unknown_parts_are_kept_aside() {
        let value = json!({
            "role": "assistant",
            "parts": [{"type": "step-start"}, {"type": "text", "text": "report"}]
        });

        let message: Message = serde_json::from_value(value).unwrap();
        assert_eq!(message.parts[0], Part::Other);
        assert_eq!(message.text(), "report");
    }

    #[test]
    fn test_file_part_aliases() {
        let value = json!({
            "role": "user",
            "parts": [{
                "type": "file",
                "name": "data.csv",
                "mediaType": "text/csv",
                "content": "a,b\n1,2\n"
            }]
        });

        let message: Message = serde_json::from_value(value).unwrap();
        assert!(message.id.is_empty());

        let file = message.files()[0];
        assert_eq!(file.filename, "data.csv");
        assert_eq!(file.text_content().as_deref(), Some("a,b\n1,2\n"));
    }

    #[test]
    fn test_from_bytes_round_trips_text() {
        let file = FilePart::from_bytes("notes.md", "text/markdown", "# Title 🔬".as_bytes());
        assert!(file.url.starts_with("data:text/markdown;base64,"));
        assert_eq!(file.text_content().as_deref(), Some("# Title 🔬"));
    }

    #[test]
    fn test_serialize_uses_client_field_names() {
        let message = Message::assistant().with_id("assistant-1").with_text("done");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "assistant-1",
                "role": "assistant",
                "parts": [{"type": "text", "text": "done"}]
            })
        );
    }
}
