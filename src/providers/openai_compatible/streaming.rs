//! Streaming converter for the chat-completions SSE format.
//!
//! Malformed-frame policy: this protocol is strict JSON-per-frame, so a
//! frame that fails to parse terminates the stream with a `ParseError`.

use std::sync::Mutex;

use eventsource_stream::Event;
use serde::Deserialize;

use crate::error::ClientError;
use crate::stream::StreamEvent;
use crate::types::{FinishReason, Usage};
use crate::utils::streaming::SseEventConverter;

use super::protocol::{map_finish_reason, WireUsage};

#[derive(Debug, Deserialize)]
struct WireChunk {
    choices: Option<Vec<WireChunkChoice>>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    delta: Option<WireDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    id: Option<String>,
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Default)]
struct ConverterState {
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    open_call: Option<String>,
    done_emitted: bool,
}

/// Chat-completions SSE converter shared by every OpenAI-compatible
/// adapter (OpenAI, Grok, Azure).
pub struct ChatCompletionsEventConverter {
    provider_id: String,
    state: Mutex<ConverterState>,
}

impl ChatCompletionsEventConverter {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            state: Mutex::new(ConverterState::default()),
        }
    }
}

impl SseEventConverter for ChatCompletionsEventConverter {
    fn convert_event(&self, event: Event) -> Vec<Result<StreamEvent, ClientError>> {
        let chunk: WireChunk = match serde_json::from_str(&event.data) {
            Ok(chunk) => chunk,
            Err(e) => {
                return vec![Err(ClientError::ParseError(format!(
                    "malformed {} stream frame: {e}",
                    self.provider_id
                )))];
            }
        };

        let mut out = Vec::new();
        let mut state = self.state.lock().expect("converter state poisoned");

        if let Some(usage) = chunk.usage {
            state.usage = Some(usage.into_usage());
        }

        let Some(choice) = chunk.choices.and_then(|c| c.into_iter().next()) else {
            return out;
        };

        if let Some(delta) = choice.delta {
            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                out.push(Ok(StreamEvent::TextDelta { delta: text }));
            }
            for call in delta.tool_calls.unwrap_or_default() {
                if let Some(id) = call.id {
                    if state.open_call.as_deref() != Some(id.as_str()) {
                        if let Some(prev) = state.open_call.take() {
                            out.push(Ok(StreamEvent::ToolCallEnd { id: prev }));
                        }
                        let name = call
                            .function
                            .as_ref()
                            .and_then(|f| f.name.clone())
                            .unwrap_or_default();
                        state.open_call = Some(id.clone());
                        out.push(Ok(StreamEvent::ToolCallStart { id, name }));
                    }
                }
                if let Some(args) = call.function.and_then(|f| f.arguments) {
                    if !args.is_empty() {
                        if let Some(open) = &state.open_call {
                            out.push(Ok(StreamEvent::ToolCallDelta {
                                id: open.clone(),
                                arguments_delta: args,
                            }));
                        }
                    }
                }
            }
        }

        if let Some(reason) = choice.finish_reason {
            state.finish_reason = Some(map_finish_reason(&reason));
        }

        out
    }

    fn finish(&self) -> Vec<Result<StreamEvent, ClientError>> {
        let mut state = self.state.lock().expect("converter state poisoned");
        if state.done_emitted {
            return Vec::new();
        }
        state.done_emitted = true;

        let mut out = Vec::new();
        if let Some(open) = state.open_call.take() {
            out.push(Ok(StreamEvent::ToolCallEnd { id: open }));
        }
        out.push(Ok(StreamEvent::Done {
            usage: state.usage.take(),
            finish_reason: state.finish_reason.take(),
        }));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &str) -> Event {
        Event {
            event: String::new(),
            data: data.to_string(),
            id: String::new(),
            retry: None,
        }
    }

    #[test]
    fn content_deltas_come_through_in_order() {
        let converter = ChatCompletionsEventConverter::new("openai");
        let events =
            converter.convert_event(frame(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#));
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::TextDelta { delta: "Hel".into() }
        );
    }

    #[test]
    fn tool_call_lifecycle_start_delta_end() {
        let converter = ChatCompletionsEventConverter::new("openai");
        let mut events = converter.convert_event(frame(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"echo","arguments":""}}]}}]}"#,
        ));
        events.extend(converter.convert_event(frame(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"x\":1}"}}]}}]}"#,
        )));
        events.extend(converter.convert_event(frame(
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        )));
        events.extend(converter.finish());

        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert!(matches!(&events[0], StreamEvent::ToolCallStart { id, name } if id == "call_1" && name == "echo"));
        assert!(matches!(&events[1], StreamEvent::ToolCallDelta { arguments_delta, .. } if arguments_delta == "{\"x\":1}"));
        assert!(matches!(&events[2], StreamEvent::ToolCallEnd { id } if id == "call_1"));
        assert!(matches!(
            &events[3],
            StreamEvent::Done { finish_reason: Some(FinishReason::ToolCalls), .. }
        ));
    }

    #[test]
    fn usage_chunk_is_folded_into_done() {
        let converter = ChatCompletionsEventConverter::new("openai");
        converter.convert_event(frame(r#"{"choices":[{"delta":{"content":"hi"},"finish_reason":"stop"}]}"#));
        converter.convert_event(frame(
            r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
        ));
        let events = converter.finish();
        assert!(matches!(
            events[0].as_ref().unwrap(),
            StreamEvent::Done { usage: Some(u), finish_reason: Some(FinishReason::Stop) }
                if u.total_tokens == 12
        ));
        // A second finish is a no-op: exactly one Done per stream.
        assert!(converter.finish().is_empty());
    }

    #[test]
    fn malformed_frame_is_a_terminal_parse_error() {
        let converter = ChatCompletionsEventConverter::new("openai");
        let events = converter.convert_event(frame("{not json"));
        assert!(matches!(events[0], Err(ClientError::ParseError(_))));
    }
}
