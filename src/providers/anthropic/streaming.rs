//! Anthropic SSE converter.
//!
//! Malformed-frame policy: unknown event types are skipped (the protocol
//! adds event kinds over time); a frame that is not JSON at all terminates
//! the stream with a `ParseError`; an `error` event terminates it with an
//! `ApiError`.

use std::sync::Mutex;

use eventsource_stream::Event;
use serde::Deserialize;

use crate::error::ClientError;
use crate::stream::StreamEvent;
use crate::types::{FinishReason, Usage};
use crate::utils::streaming::SseEventConverter;

use super::map_stop_reason;

#[derive(Debug, Deserialize)]
struct WireStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    message: Option<WireMessageStart>,
    content_block: Option<WireContentBlock>,
    delta: Option<WireDelta>,
    usage: Option<super::WireUsage>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireMessageStart {
    usage: Option<super::WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type")]
    kind: String,
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    text: Option<String>,
    partial_json: Option<String>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: Option<String>,
}

#[derive(Default)]
struct ConverterState {
    input_tokens: u32,
    output_tokens: u32,
    saw_usage: bool,
    finish_reason: Option<FinishReason>,
    open_call: Option<String>,
    done_emitted: bool,
}

impl ConverterState {
    fn usage(&self) -> Option<Usage> {
        self.saw_usage
            .then(|| Usage::new(self.input_tokens, self.output_tokens))
    }
}

/// Anthropic stream converter.
pub struct AnthropicEventConverter {
    state: Mutex<ConverterState>,
}

impl AnthropicEventConverter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConverterState::default()),
        }
    }
}

impl Default for AnthropicEventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SseEventConverter for AnthropicEventConverter {
    fn convert_event(&self, event: Event) -> Vec<Result<StreamEvent, ClientError>> {
        let wire: WireStreamEvent = match serde_json::from_str(&event.data) {
            Ok(wire) => wire,
            Err(e) => {
                return vec![Err(ClientError::ParseError(format!(
                    "malformed anthropic stream frame: {e}"
                )))];
            }
        };

        let mut state = self.state.lock().expect("converter state poisoned");
        match wire.kind.as_str() {
            "message_start" => {
                if let Some(usage) = wire.message.and_then(|m| m.usage) {
                    state.input_tokens = usage.input_tokens.unwrap_or(0);
                    state.saw_usage = true;
                }
                Vec::new()
            }
            "content_block_start" => {
                let Some(block) = wire.content_block.filter(|b| b.kind == "tool_use") else {
                    return Vec::new();
                };
                let id = block.id.unwrap_or_default();
                state.open_call = Some(id.clone());
                vec![Ok(StreamEvent::ToolCallStart {
                    id,
                    name: block.name.unwrap_or_default(),
                })]
            }
            "content_block_delta" => {
                let Some(delta) = wire.delta else {
                    return Vec::new();
                };
                let mut out = Vec::new();
                if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                    out.push(Ok(StreamEvent::TextDelta { delta: text }));
                }
                if let Some(partial) = delta.partial_json.filter(|p| !p.is_empty()) {
                    if let Some(open) = &state.open_call {
                        out.push(Ok(StreamEvent::ToolCallDelta {
                            id: open.clone(),
                            arguments_delta: partial,
                        }));
                    }
                }
                out
            }
            "content_block_stop" => state
                .open_call
                .take()
                .map(|id| vec![Ok(StreamEvent::ToolCallEnd { id })])
                .unwrap_or_default(),
            "message_delta" => {
                if let Some(usage) = wire.usage {
                    state.output_tokens = usage.output_tokens.unwrap_or(state.output_tokens);
                    state.saw_usage = true;
                }
                if let Some(reason) = wire.delta.and_then(|d| d.stop_reason) {
                    state.finish_reason = Some(map_stop_reason(&reason));
                }
                Vec::new()
            }
            "message_stop" => {
                state.done_emitted = true;
                vec![Ok(StreamEvent::Done {
                    usage: state.usage(),
                    finish_reason: state.finish_reason.take(),
                })]
            }
            "error" => {
                let message = wire
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "unknown stream error".to_string());
                vec![Err(ClientError::ApiError {
                    code: 0,
                    message,
                    details: None,
                })]
            }
            // ping and future event kinds are skipped.
            other => {
                tracing::debug!(target: "llmux::anthropic", kind = other, "skipping stream event");
                Vec::new()
            }
        }
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
            usage: state.usage(),
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
    fn full_message_lifecycle() {
        let converter = AnthropicEventConverter::new();
        let mut events = Vec::new();
        for data in [
            r#"{"type":"message_start","message":{"usage":{"input_tokens":9}}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello "}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"world"}}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":3}}"#,
            r#"{"type":"message_stop"}"#,
        ] {
            events.extend(converter.convert_event(frame(data)));
        }

        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello world");
        match events.last().expect("done") {
            StreamEvent::Done { usage, finish_reason } => {
                assert_eq!(usage.as_ref().map(|u| u.total_tokens), Some(12));
                assert_eq!(finish_reason, &Some(FinishReason::Stop));
            }
            other => panic!("expected Done, got {other:?}"),
        }
        assert!(converter.finish().is_empty(), "no second Done");
    }

    #[test]
    fn tool_use_blocks_produce_call_events() {
        let converter = AnthropicEventConverter::new();
        let mut events = Vec::new();
        for data in [
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"get_weather"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"city\":"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"\"Tokyo\"}"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
        ] {
            events.extend(converter.convert_event(frame(data)));
        }
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert!(matches!(&events[0], StreamEvent::ToolCallStart { id, name } if id == "toolu_1" && name == "get_weather"));
        assert!(matches!(&events[1], StreamEvent::ToolCallDelta { .. }));
        assert!(matches!(events.last().unwrap(), StreamEvent::ToolCallEnd { id } if id == "toolu_1"));
    }

    #[test]
    fn ping_frames_are_skipped() {
        let converter = AnthropicEventConverter::new();
        assert!(converter.convert_event(frame(r#"{"type":"ping"}"#)).is_empty());
    }

    #[test]
    fn error_event_is_a_terminal_api_error() {
        let converter = AnthropicEventConverter::new();
        let events = converter.convert_event(frame(
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        ));
        assert!(matches!(
            &events[0],
            Err(ClientError::ApiError { message, .. }) if message.contains("invalid x-api-key")
        ));
    }

    #[test]
    fn close_without_message_stop_synthesizes_done() {
        let converter = AnthropicEventConverter::new();
        converter.convert_event(frame(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"partial"}}"#,
        ));
        let events = converter.finish();
        assert!(matches!(
            events.last().unwrap().as_ref().unwrap(),
            StreamEvent::Done { .. }
        ));
    }
}
