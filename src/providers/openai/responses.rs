//! OpenAI responses-API adapter.
//!
//! Same vendor as the chat adapter, different wire surface: item-based
//! request input, typed SSE event frames, `instructions` for system text.

use std::sync::Mutex;

use async_trait::async_trait;
use eventsource_stream::Event;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::argument::ToolArgument;
use crate::error::ClientError;
use crate::providers::ProviderKind;
use crate::stream::{ChatStream, StreamEvent};
use crate::traits::{check_not_cancelled, TextGenerator};
use crate::types::{
    ChatRequest, ChatResponse, ContentPart, FinishReason, MessageContent, MessageRole,
    ModelCapabilities, ModelInfo, Usage,
};
use crate::utils::streaming::{capped_api_error, SseEventConverter, StreamFactory};
use crate::utils::url::join_url;

use super::OpenAiConfig;

/// OpenAI responses-API adapter.
pub struct OpenAiResponses {
    config: OpenAiConfig,
    model: ModelInfo,
    http: reqwest::Client,
}

impl OpenAiResponses {
    pub fn new(config: OpenAiConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::AuthenticationFailed(
                "no API key resolved for openai".to_string(),
            ));
        }
        crate::utils::url::validate_base_url(&config.base_url)?;
        let model = ModelInfo::new(
            ProviderKind::OpenAi,
            &config.model,
            ModelCapabilities::multimodal(),
        );
        Ok(Self {
            config,
            model,
            http,
        })
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, ClientError> {
        let mut input = Vec::new();
        let mut instructions = Vec::new();

        for message in &request.messages {
            match message.role {
                MessageRole::System => instructions.push(message.content.all_text()),
                MessageRole::User => {
                    let content: Vec<Value> = message
                        .content
                        .parts()
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::Text { text } => {
                                Some(json!({ "type": "input_text", "text": text }))
                            }
                            ContentPart::Image { source, media_type } => {
                                let url = source.as_url().map(str::to_string).unwrap_or_else(|| {
                                    format!(
                                        "data:{};base64,{}",
                                        media_type,
                                        source.as_base64().unwrap_or_default()
                                    )
                                });
                                Some(json!({ "type": "input_image", "image_url": url }))
                            }
                            _ => None,
                        })
                        .collect();
                    input.push(json!({ "role": "user", "content": content }));
                }
                MessageRole::Assistant => {
                    let text = message.content.all_text();
                    if !text.is_empty() {
                        input.push(json!({
                            "role": "assistant",
                            "content": [{ "type": "output_text", "text": text }],
                        }));
                    }
                    for part in message.content.parts() {
                        if let ContentPart::ToolCall { id, name, arguments } = part {
                            input.push(json!({
                                "type": "function_call",
                                "call_id": id,
                                "name": name,
                                "arguments": serde_json::to_string(&arguments.into_json())
                                    .unwrap_or_default(),
                            }));
                        }
                    }
                }
                MessageRole::Tool => {
                    for part in message.content.parts() {
                        if let ContentPart::ToolResult { call_id, output } = part {
                            input.push(json!({
                                "type": "function_call_output",
                                "call_id": call_id,
                                "output": serde_json::to_string(&output.into_json())
                                    .unwrap_or_default(),
                            }));
                        }
                    }
                }
            }
        }

        let mut body = json!({
            "model": self.config.model,
            "input": input,
            "stream": stream,
        });
        if !instructions.is_empty() {
            body["instructions"] = json!(instructions.join("\n"));
        }
        if let Some(temperature) = request.params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.params.max_tokens {
            body["max_output_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = request.params.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(tools) = &request.tools {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        let function = tool.as_function();
                        json!({
                            "type": "function",
                            "name": function.name,
                            "description": function.description,
                            "parameters": function.parameters,
                        })
                    })
                    .collect(),
            );
        }
        Ok(body)
    }

    fn request_builder(&self, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(join_url(&self.config.base_url, "responses"))
            .bearer_auth(&self.config.api_key)
            .json(body)
    }
}

fn map_status(status: &str, incomplete_reason: Option<&str>) -> FinishReason {
    match (status, incomplete_reason) {
        ("completed", _) => FinishReason::Stop,
        ("incomplete", Some("max_output_tokens")) => FinishReason::Length,
        ("incomplete", Some("content_filter")) => FinishReason::ContentFilter,
        (other, _) => FinishReason::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: Option<String>,
    model: Option<String>,
    status: Option<String>,
    incomplete_details: Option<WireIncompleteDetails>,
    output: Option<Vec<WireOutputItem>>,
    usage: Option<WireResponsesUsage>,
}

#[derive(Debug, Deserialize)]
struct WireIncompleteDetails {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOutputItem {
    #[serde(rename = "type")]
    kind: String,
    content: Option<Vec<WireOutputContent>>,
    call_id: Option<String>,
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOutputContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponsesUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl WireResponsesUsage {
    fn into_usage(self) -> Usage {
        let prompt = self.input_tokens.unwrap_or(0);
        match self.output_tokens {
            Some(output) => Usage {
                prompt_tokens: prompt,
                completion_tokens: output,
                total_tokens: self.total_tokens.unwrap_or(prompt + output),
            },
            None => Usage::from_prompt_and_total(prompt, self.total_tokens.unwrap_or(prompt)),
        }
    }
}

fn parse_response(body: &str) -> Result<ChatResponse, ClientError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::ParseError(format!("malformed openai responses body: {e}")))?;

    let mut response = ChatResponse::empty("openai");
    response.id = wire.id;
    response.model = wire.model;
    response.usage = wire.usage.map(WireResponsesUsage::into_usage);

    let mut parts = Vec::new();
    let mut saw_tool_call = false;
    for item in wire.output.unwrap_or_default() {
        match item.kind.as_str() {
            "message" => {
                for content in item.content.unwrap_or_default() {
                    if content.kind == "output_text" {
                        if let Some(text) = content.text.filter(|t| !t.is_empty()) {
                            parts.push(ContentPart::text(text));
                        }
                    }
                }
            }
            "function_call" => {
                saw_tool_call = true;
                parts.push(ContentPart::tool_call(
                    item.call_id.unwrap_or_default(),
                    item.name.unwrap_or_default(),
                    ToolArgument::parse_str(item.arguments.as_deref().unwrap_or("")),
                ));
            }
            _ => {}
        }
    }

    response.finish_reason = Some(if saw_tool_call {
        FinishReason::ToolCalls
    } else {
        map_status(
            wire.status.as_deref().unwrap_or("completed"),
            wire.incomplete_details.and_then(|d| d.reason).as_deref(),
        )
    });
    response.content = match parts.as_slice() {
        [ContentPart::Text { text }] => MessageContent::Text(text.clone()),
        _ => MessageContent::Parts(parts),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct WireStreamFrame {
    #[serde(rename = "type")]
    kind: String,
    delta: Option<String>,
    item: Option<WireOutputItem>,
    response: Option<WireResponse>,
}

#[derive(Default)]
struct ConverterState {
    open_call: Option<String>,
    done_emitted: bool,
}

/// Responses-API SSE converter.
///
/// Malformed-frame policy: strict, a frame that fails to parse terminates
/// the stream with a `ParseError`.
pub struct ResponsesEventConverter {
    state: Mutex<ConverterState>,
}

impl ResponsesEventConverter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConverterState::default()),
        }
    }
}

impl Default for ResponsesEventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SseEventConverter for ResponsesEventConverter {
    fn convert_event(&self, event: Event) -> Vec<Result<StreamEvent, ClientError>> {
        let frame: WireStreamFrame = match serde_json::from_str(&event.data) {
            Ok(frame) => frame,
            Err(e) => {
                return vec![Err(ClientError::ParseError(format!(
                    "malformed openai responses stream frame: {e}"
                )))];
            }
        };

        let mut state = self.state.lock().expect("converter state poisoned");
        match frame.kind.as_str() {
            "response.output_text.delta" => frame
                .delta
                .filter(|d| !d.is_empty())
                .map(|delta| vec![Ok(StreamEvent::TextDelta { delta })])
                .unwrap_or_default(),
            "response.output_item.added" => {
                let Some(item) = frame.item.filter(|i| i.kind == "function_call") else {
                    return Vec::new();
                };
                let id = item.call_id.unwrap_or_default();
                state.open_call = Some(id.clone());
                vec![Ok(StreamEvent::ToolCallStart {
                    id,
                    name: item.name.unwrap_or_default(),
                })]
            }
            "response.function_call_arguments.delta" => {
                let (Some(open), Some(delta)) = (&state.open_call, frame.delta) else {
                    return Vec::new();
                };
                vec![Ok(StreamEvent::ToolCallDelta {
                    id: open.clone(),
                    arguments_delta: delta,
                })]
            }
            "response.output_item.done" => state
                .open_call
                .take()
                .map(|id| vec![Ok(StreamEvent::ToolCallEnd { id })])
                .unwrap_or_default(),
            "response.completed" | "response.incomplete" => {
                state.done_emitted = true;
                let (usage, finish_reason) = frame
                    .response
                    .map(|r| {
                        let finish = map_status(
                            r.status.as_deref().unwrap_or("completed"),
                            r.incomplete_details.and_then(|d| d.reason).as_deref(),
                        );
                        (r.usage.map(WireResponsesUsage::into_usage), Some(finish))
                    })
                    .unwrap_or((None, Some(FinishReason::Stop)));
                vec![Ok(StreamEvent::Done {
                    usage,
                    finish_reason,
                })]
            }
            "response.failed" => vec![Err(ClientError::ApiError {
                code: 0,
                message: "openai responses stream reported failure".to_string(),
                details: None,
            })],
            _ => Vec::new(),
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
            usage: None,
            finish_reason: None,
        }));
        out
    }
}

#[async_trait]
impl TextGenerator for OpenAiResponses {
    fn model_info(&self) -> &ModelInfo {
        &self.model
    }

    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let body = self.build_body(&request, false)?;

        let response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to send request: {e}")))?;
        if !response.status().is_success() {
            return Err(capped_api_error(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to read response: {e}")))?;
        parse_response(&text)
    }

    async fn stream_text(&self, request: ChatRequest) -> Result<ChatStream, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let body = self.build_body(&request, true)?;
        StreamFactory::eventsource_stream(
            self.request_builder(&body)
                .header(reqwest::header::ACCEPT, "text/event-stream"),
            ResponsesEventConverter::new(),
            request.cancel.clone(),
        )
        .await
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
    fn text_deltas_and_completion() {
        let converter = ResponsesEventConverter::new();
        let events =
            converter.convert_event(frame(r#"{"type":"response.output_text.delta","delta":"Hi"}"#));
        assert!(matches!(
            events[0].as_ref().unwrap(),
            StreamEvent::TextDelta { delta } if delta == "Hi"
        ));

        let events = converter.convert_event(frame(
            r#"{"type":"response.completed","response":{"status":"completed","usage":{"input_tokens":4,"output_tokens":2,"total_tokens":6}}}"#,
        ));
        assert!(matches!(
            events[0].as_ref().unwrap(),
            StreamEvent::Done { usage: Some(u), finish_reason: Some(FinishReason::Stop) }
                if u.total_tokens == 6
        ));
        // Nothing is synthesized after the vendor's own completion frame.
        assert!(converter.finish().is_empty());
    }

    #[test]
    fn buffered_response_parses_text_and_usage() {
        let body = r#"{
            "id": "resp_1",
            "model": "gpt-4o-mini",
            "status": "completed",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "Hello"}]}],
            "usage": {"input_tokens": 10, "total_tokens": 10}
        }"#;
        let response = parse_response(body).expect("parse");
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.expect("usage").completion_tokens, 0);
    }

    #[test]
    fn incomplete_due_to_length_maps_to_length() {
        let body = r#"{
            "status": "incomplete",
            "incomplete_details": {"reason": "max_output_tokens"},
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "trunc"}]}]
        }"#;
        let response = parse_response(body).expect("parse");
        assert_eq!(response.finish_reason, Some(FinishReason::Length));
    }
}
