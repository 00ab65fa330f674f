//! Chat response types

use serde::{Deserialize, Serialize};

use super::message::{ContentPart, MessageContent};

/// Token usage reported by the vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Reconstruct usage from prompt and total counts only.
    ///
    /// Some vendors report prompt and total tokens without a completion
    /// count; the derived completion count saturates at zero so vendor
    /// rounding can never produce a negative value.
    pub const fn from_prompt_and_total(prompt_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens: total_tokens.saturating_sub(prompt_tokens),
            total_tokens,
        }
    }
}

/// Reason why the model stopped generating tokens.
///
/// Closed set; vendor strings outside each adapter's lookup table map to
/// `Other` with the raw value preserved, and never fail the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model completed naturally or hit a stop sequence
    Stop,
    /// Model reached the output token limit
    Length,
    /// Content was filtered for safety/policy reasons
    ContentFilter,
    /// Model requested one or more tool calls
    ToolCalls,
    /// Unrecognized vendor finish reason, raw value preserved
    Other(String),
}

/// A unified chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Vendor response id, when one was provided
    pub id: Option<String>,
    /// Model that produced the response
    pub model: Option<String>,
    /// Provider name (e.g. "openai")
    pub provider: String,
    /// Creation time as observed by this client
    pub created: Option<chrono::DateTime<chrono::Utc>>,
    /// Response content; tool calls surface as `ContentPart::ToolCall` parts
    pub content: MessageContent,
    pub usage: Option<Usage>,
    pub finish_reason: Option<FinishReason>,
}

impl ChatResponse {
    /// Empty response skeleton for a provider.
    pub fn empty(provider: impl Into<String>) -> Self {
        Self {
            id: None,
            model: None,
            provider: provider.into(),
            created: Some(chrono::Utc::now()),
            content: MessageContent::Text(String::new()),
            usage: None,
            finish_reason: None,
        }
    }

    /// Final response text (all text fragments concatenated)
    pub fn text(&self) -> String {
        self.content.all_text()
    }

    /// Tool calls requested by the model
    pub fn tool_calls(&self) -> Vec<&ContentPart> {
        match &self.content {
            MessageContent::Parts(parts) => parts.iter().filter(|p| p.is_tool_call()).collect(),
            MessageContent::Text(_) => vec![],
        }
    }
}
