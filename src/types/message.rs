//! Chat message types

use serde::{Deserialize, Serialize};

use crate::argument::ToolArgument;

/// Message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Media source - unified way to represent media data across providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MediaSource {
    /// URL (http, https, data URLs, etc.)
    Url { url: String },
    /// Base64-encoded data
    Base64 { data: String },
    /// Binary data (base64-encoded when a vendor needs inline bytes)
    #[serde(skip)]
    Binary { data: Vec<u8> },
}

impl MediaSource {
    /// Create from URL string
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    /// Create from base64 string
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64 { data: data.into() }
    }

    /// Create from binary data
    pub fn binary(data: Vec<u8>) -> Self {
        Self::Binary { data }
    }

    /// Get as base64 if available, or convert binary to base64
    pub fn as_base64(&self) -> Option<String> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        match self {
            Self::Base64 { data } => Some(data.clone()),
            Self::Binary { data } => Some(STANDARD.encode(data)),
            Self::Url { .. } => None,
        }
    }

    /// Get as URL if available
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url { url } => Some(url),
            _ => None,
        }
    }
}

/// Content part - provider-agnostic multimodal content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// Text content
    Text { text: String },

    /// Image content - URL, base64, or raw bytes plus its media type
    Image {
        #[serde(flatten)]
        source: MediaSource,
        media_type: String,
    },

    /// Tool call (function call request from the model)
    #[serde(rename = "tool-call")]
    ToolCall {
        id: String,
        name: String,
        arguments: ToolArgument,
    },

    /// Tool result (function execution result, matched to a call by id)
    #[serde(rename = "tool-result")]
    ToolResult { call_id: String, output: ToolArgument },
}

impl ContentPart {
    /// Create a text content part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image content part from a URL
    pub fn image_url(url: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::Image {
            source: MediaSource::url(url),
            media_type: media_type.into(),
        }
    }

    /// Create an image content part from raw bytes
    pub fn image_bytes(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self::Image {
            source: MediaSource::binary(data),
            media_type: media_type.into(),
        }
    }

    /// Create a tool call content part
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: ToolArgument,
    ) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool result content part
    pub fn tool_result(call_id: impl Into<String>, output: ToolArgument) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            output,
        }
    }

    /// Check if this is a tool call
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }

    /// Get the text content if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Message content - plain text or an ordered sequence of parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// First text fragment, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(parts) => parts.iter().find_map(ContentPart::as_text),
        }
    }

    /// Concatenation of every text fragment, in order
    pub fn all_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Content parts, promoting plain text to a single-part view
    pub fn parts(&self) -> Vec<ContentPart> {
        match self {
            Self::Text(text) => vec![ContentPart::text(text.clone())],
            Self::Parts(parts) => parts.clone(),
        }
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    /// Creates a user message
    pub fn user(content: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(MessageRole::User, content)
    }

    /// Creates a system message
    pub fn system(content: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(MessageRole::System, content)
    }

    /// Creates an assistant message
    pub fn assistant(content: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(MessageRole::Assistant, content)
    }

    /// Creates a tool result message
    pub fn tool_result(call_id: impl Into<String>, output: ToolArgument) -> ChatMessage {
        ChatMessage {
            role: MessageRole::Tool,
            content: MessageContent::Parts(vec![ContentPart::tool_result(call_id, output)]),
        }
    }

    /// Gets the text content of the message
    pub fn content_text(&self) -> Option<&str> {
        self.content.text()
    }

    /// Extract all tool calls from content
    pub fn tool_calls(&self) -> Vec<&ContentPart> {
        match &self.content {
            MessageContent::Parts(parts) => parts.iter().filter(|p| p.is_tool_call()).collect(),
            MessageContent::Text(_) => vec![],
        }
    }
}

/// Chat message builder
#[derive(Debug, Clone)]
pub struct ChatMessageBuilder {
    role: MessageRole,
    parts: Vec<ContentPart>,
}

impl ChatMessageBuilder {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![ContentPart::text(content)],
        }
    }

    /// Appends an image part
    pub fn with_image(mut self, source: MediaSource, media_type: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Image {
            source,
            media_type: media_type.into(),
        });
        self
    }

    /// Appends arbitrary content parts
    pub fn with_parts(mut self, parts: Vec<ContentPart>) -> Self {
        self.parts.extend(parts);
        self
    }

    /// Builds the message
    pub fn build(self) -> ChatMessage {
        let content = match self.parts.as_slice() {
            [ContentPart::Text { text }] => MessageContent::Text(text.clone()),
            _ => MessageContent::Parts(self.parts),
        };
        ChatMessage {
            role: self.role,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collapses_single_text_part() {
        let msg = ChatMessage::user("hello").build();
        assert_eq!(msg.content, MessageContent::Text("hello".into()));
        assert_eq!(msg.content_text(), Some("hello"));
    }

    #[test]
    fn builder_keeps_part_order() {
        let msg = ChatMessage::user("look at this")
            .with_image(MediaSource::base64("aGk="), "image/png")
            .build();
        match &msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].as_text(), Some("look at this"));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn all_text_concatenates_in_order() {
        let content = MessageContent::Parts(vec![
            ContentPart::text("a"),
            ContentPart::image_url("https://example.com/x.png", "image/png"),
            ContentPart::text("b"),
        ]);
        assert_eq!(content.all_text(), "ab");
    }
}
