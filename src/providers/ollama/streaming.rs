//! Ollama NDJSON converter.
//!
//! Malformed-line policy: skipped with a warning; the daemon occasionally
//! interleaves status lines that are not chat payloads.

use std::sync::Mutex;

use serde::Deserialize;

use crate::error::ClientError;
use crate::stream::StreamEvent;
use crate::types::{FinishReason, Usage};
use crate::utils::streaming::JsonEventConverter;

use super::map_done_reason;

#[derive(Debug, Deserialize)]
struct WireStreamLine {
    message: Option<super::WireMessage>,
    done: Option<bool>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Default)]
struct ConverterState {
    finish_reason: Option<FinishReason>,
    done_emitted: bool,
}

/// Ollama stream converter.
pub struct OllamaEventConverter {
    state: Mutex<ConverterState>,
}

impl OllamaEventConverter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConverterState::default()),
        }
    }
}

impl Default for OllamaEventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonEventConverter for OllamaEventConverter {
    fn convert_json(&self, json_data: &str) -> Vec<Result<StreamEvent, ClientError>> {
        let wire: WireStreamLine = match serde_json::from_str(json_data) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(target: "llmux::ollama", error = %e, "skipping malformed stream line");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        let mut state = self.state.lock().expect("converter state poisoned");

        if let Some(message) = wire.message {
            if let Some(text) = message.content.filter(|t| !t.is_empty()) {
                out.push(Ok(StreamEvent::TextDelta { delta: text }));
            }
            for call in message.tool_calls.unwrap_or_default() {
                let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                let args = call.function.arguments.unwrap_or(serde_json::Value::Null);
                out.push(Ok(StreamEvent::ToolCallStart {
                    id: id.clone(),
                    name: call.function.name,
                }));
                out.push(Ok(StreamEvent::ToolCallDelta {
                    id: id.clone(),
                    arguments_delta: args.to_string(),
                }));
                out.push(Ok(StreamEvent::ToolCallEnd { id }));
                state.finish_reason.get_or_insert(FinishReason::ToolCalls);
            }
        }

        if let Some(reason) = wire.done_reason {
            // A tool-call turn still reports done_reason "stop"; keep the
            // ToolCalls classification once a call was seen.
            if state.finish_reason != Some(FinishReason::ToolCalls) {
                state.finish_reason = Some(map_done_reason(&reason));
            }
        }

        if wire.done == Some(true) {
            state.done_emitted = true;
            let usage = match (wire.prompt_eval_count, wire.eval_count) {
                (Some(prompt), Some(eval)) => Some(Usage::new(prompt, eval)),
                _ => None,
            };
            out.push(Ok(StreamEvent::Done {
                usage,
                finish_reason: state.finish_reason.take(),
            }));
        }

        out
    }

    fn finish(&self) -> Vec<Result<StreamEvent, ClientError>> {
        let mut state = self.state.lock().expect("converter state poisoned");
        if state.done_emitted {
            return Vec::new();
        }
        state.done_emitted = true;
        vec![Ok(StreamEvent::Done {
            usage: None,
            finish_reason: state.finish_reason.take(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_lines_become_deltas() {
        let converter = OllamaEventConverter::new();
        let events = converter.convert_json(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hey"},"done":false}"#,
        );
        assert!(matches!(
            events[0].as_ref().unwrap(),
            StreamEvent::TextDelta { delta } if delta == "Hey"
        ));
    }

    #[test]
    fn final_line_emits_done_with_usage() {
        let converter = OllamaEventConverter::new();
        let events = converter.convert_json(
            r#"{"model":"llama3.2","done":true,"done_reason":"stop","prompt_eval_count":10,"eval_count":20}"#,
        );
        match events.last().unwrap().as_ref().unwrap() {
            StreamEvent::Done { usage, finish_reason } => {
                let usage = usage.as_ref().expect("usage");
                assert_eq!(usage.prompt_tokens, 10);
                assert_eq!(usage.completion_tokens, 20);
                assert_eq!(finish_reason, &Some(FinishReason::Stop));
            }
            other => panic!("expected Done, got {other:?}"),
        }
        assert!(converter.finish().is_empty(), "no second Done after the vendor's");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let converter = OllamaEventConverter::new();
        assert!(converter.convert_json("not json").is_empty());
    }
}
