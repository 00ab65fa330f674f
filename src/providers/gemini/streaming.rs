//! Gemini SSE converter.
//!
//! Malformed-frame policy: skipped with a warning. The vendor's SSE
//! surface emits cosmetic variations (array punctuation, keep-alives)
//! that are not worth killing a stream over.
//!
//! The vendor never sends an explicit terminal frame; `Done` is
//! synthesized at stream close from the last-seen usage and finish
//! reason.

use std::sync::Mutex;

use eventsource_stream::Event;
use serde::Deserialize;

use crate::error::ClientError;
use crate::stream::StreamEvent;
use crate::types::{FinishReason, Usage};
use crate::utils::streaming::SseEventConverter;

use super::map_finish_reason;

#[derive(Debug, Deserialize)]
struct WireStreamResponse {
    candidates: Option<Vec<WireCandidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<WireUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    parts: Option<Vec<WirePart>>,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    text: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    args: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireUsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

impl WireUsageMetadata {
    fn into_usage(self) -> Usage {
        let prompt = self.prompt_token_count.unwrap_or(0);
        match self.candidates_token_count {
            Some(candidates) => Usage {
                prompt_tokens: prompt,
                completion_tokens: candidates,
                total_tokens: self.total_token_count.unwrap_or(prompt + candidates),
            },
            // Only prompt and total reported: derive, never negative.
            None => Usage::from_prompt_and_total(prompt, self.total_token_count.unwrap_or(prompt)),
        }
    }
}

#[derive(Default)]
struct ConverterState {
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    done_emitted: bool,
}

/// Gemini stream converter.
pub struct GeminiEventConverter {
    state: Mutex<ConverterState>,
}

impl GeminiEventConverter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConverterState::default()),
        }
    }
}

impl Default for GeminiEventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SseEventConverter for GeminiEventConverter {
    fn convert_event(&self, event: Event) -> Vec<Result<StreamEvent, ClientError>> {
        let wire: WireStreamResponse = match serde_json::from_str(&event.data) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(target: "llmux::gemini", error = %e, "skipping malformed stream frame");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        let mut state = self.state.lock().expect("converter state poisoned");

        if let Some(usage) = wire.usage_metadata {
            state.usage = Some(usage.into_usage());
        }

        let Some(candidate) = wire.candidates.and_then(|c| c.into_iter().next()) else {
            return out;
        };

        for part in candidate
            .content
            .and_then(|c| c.parts)
            .unwrap_or_default()
        {
            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                out.push(Ok(StreamEvent::TextDelta { delta: text }));
            }
            if let Some(call) = part.function_call {
                // The vendor sends complete calls without ids; synthesize
                // one and emit the full start/delta/end lifecycle.
                let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                let args = call.args.unwrap_or(serde_json::Value::Null);
                out.push(Ok(StreamEvent::ToolCallStart {
                    id: id.clone(),
                    name: call.name,
                }));
                out.push(Ok(StreamEvent::ToolCallDelta {
                    id: id.clone(),
                    arguments_delta: args.to_string(),
                }));
                out.push(Ok(StreamEvent::ToolCallEnd { id }));
                state.finish_reason.get_or_insert(FinishReason::ToolCalls);
            }
        }

        if let Some(reason) = candidate.finish_reason {
            // The vendor reports STOP even for tool-call turns; a seen
            // function call keeps the ToolCalls classification.
            if state.finish_reason != Some(FinishReason::ToolCalls) {
                state.finish_reason = Some(map_finish_reason(&reason));
            }
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
            usage: state.usage.take(),
            finish_reason: state.finish_reason.take(),
        })]
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
    fn text_parts_become_deltas() {
        let converter = GeminiEventConverter::new();
        let events = converter.convert_event(frame(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}]}"#,
        ));
        assert!(matches!(
            events[0].as_ref().unwrap(),
            StreamEvent::TextDelta { delta } if delta == "Hello"
        ));
    }

    #[test]
    fn done_is_synthesized_at_close_with_last_seen_state() {
        let converter = GeminiEventConverter::new();
        converter.convert_event(frame(
            r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":10,"totalTokenCount":10}}"#,
        ));
        let events = converter.finish();
        match events[0].as_ref().unwrap() {
            StreamEvent::Done { usage, finish_reason } => {
                let usage = usage.as_ref().expect("usage");
                assert_eq!(usage.completion_tokens, 0);
                assert_eq!(finish_reason, &Some(FinishReason::Stop));
            }
            other => panic!("expected Done, got {other:?}"),
        }
        assert!(converter.finish().is_empty(), "exactly one Done");
    }

    #[test]
    fn function_calls_get_synthesized_ids() {
        let converter = GeminiEventConverter::new();
        let events = converter.convert_event(frame(
            r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"get_weather","args":{"city":"Oslo"}}}]}}]}"#,
        ));
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events.len(), 3);
        let StreamEvent::ToolCallStart { id, name } = &events[0] else {
            panic!("expected start");
        };
        assert!(id.starts_with("call_"));
        assert_eq!(name, "get_weather");
        assert!(matches!(&events[2], StreamEvent::ToolCallEnd { id: end } if end == id));
    }

    #[test]
    fn malformed_frames_are_skipped_not_fatal() {
        let converter = GeminiEventConverter::new();
        assert!(converter.convert_event(frame("{broken")).is_empty());
        let events = converter.convert_event(frame(
            r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#,
        ));
        assert_eq!(events.len(), 1, "stream continues after a bad frame");
    }
}
