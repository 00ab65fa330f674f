//! Unified streaming event types.

use std::pin::Pin;

use futures::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::{ChatResponse, FinishReason, MessageContent, Usage};
use crate::utils::cancel::CancelHandle;

/// Vendor-agnostic event emitted while a response is produced incrementally.
///
/// Every well-formed stream ends with exactly one `Done` (or a terminal
/// `Err` item); nothing follows termination. Concatenating `TextDelta`
/// payloads in emission order reconstructs the full response text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StreamEvent {
    /// Incremental response text
    TextDelta { delta: String },
    /// The model opened a tool call
    ToolCallStart { id: String, name: String },
    /// Incremental tool call arguments (a JSON string fragment)
    ToolCallDelta { id: String, arguments_delta: String },
    /// The tool call's arguments are complete
    ToolCallEnd { id: String },
    /// Terminal event carrying whatever usage/finish data the vendor reported
    Done {
        usage: Option<Usage>,
        finish_reason: Option<FinishReason>,
    },
}

impl StreamEvent {
    /// True for the terminal `Done` event.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// A lazy sequence of unified stream events.
///
/// Dropping the stream closes the underlying HTTP connection, so the
/// vendor stops generating tokens.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// A stream paired with the handle that cancels it.
pub struct ChatStreamHandle {
    pub stream: ChatStream,
    pub cancel: CancelHandle,
}

/// Drain a stream into a single [`ChatResponse`].
///
/// Folds `TextDelta` events into the final text and captures the `Done`
/// payload. This is the canonical `generate_text` implementation for
/// vendors whose REST surface is stream-first.
pub async fn collect_response(
    mut stream: ChatStream,
    provider: impl Into<String>,
) -> Result<ChatResponse, ClientError> {
    use crate::argument::ToolArgument;
    use crate::types::ContentPart;

    let mut response = ChatResponse::empty(provider);
    let mut text = String::new();
    // (id, name, accumulated argument fragments), in call order.
    let mut calls: Vec<(String, String, String)> = Vec::new();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::TextDelta { delta } => text.push_str(&delta),
            StreamEvent::ToolCallStart { id, name } => calls.push((id, name, String::new())),
            StreamEvent::ToolCallDelta {
                id,
                arguments_delta,
            } => {
                if let Some(call) = calls.iter_mut().find(|(call_id, _, _)| *call_id == id) {
                    call.2.push_str(&arguments_delta);
                }
            }
            StreamEvent::ToolCallEnd { .. } => {}
            StreamEvent::Done {
                usage,
                finish_reason,
            } => {
                response.usage = usage;
                response.finish_reason = finish_reason;
                break;
            }
        }
    }

    response.content = if calls.is_empty() {
        MessageContent::Text(text)
    } else {
        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        for (id, name, arguments) in calls {
            parts.push(ContentPart::tool_call(
                id,
                name,
                ToolArgument::parse_str(&arguments),
            ));
        }
        MessageContent::Parts(parts)
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_response_folds_deltas_and_done() {
        let events: Vec<Result<StreamEvent, ClientError>> = vec![
            Ok(StreamEvent::TextDelta { delta: "Hel".into() }),
            Ok(StreamEvent::TextDelta { delta: "lo".into() }),
            Ok(StreamEvent::Done {
                usage: Some(Usage::new(3, 2)),
                finish_reason: Some(FinishReason::Stop),
            }),
        ];
        let stream: ChatStream = Box::pin(futures::stream::iter(events));

        let response = collect_response(stream, "test").await.expect("collect");
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(5));
    }

    #[tokio::test]
    async fn collect_response_surfaces_terminal_error() {
        let events: Vec<Result<StreamEvent, ClientError>> = vec![
            Ok(StreamEvent::TextDelta { delta: "partial".into() }),
            Err(ClientError::StreamError("connection lost".into())),
        ];
        let stream: ChatStream = Box::pin(futures::stream::iter(events));

        let err = collect_response(stream, "test").await.unwrap_err();
        assert!(matches!(err, ClientError::StreamError(_)));
    }
}
