//! Anthropic messages-API adapter.

pub mod streaming;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::argument::ToolArgument;
use crate::error::ClientError;
use crate::providers::ProviderKind;
use crate::stream::ChatStream;
use crate::traits::{check_not_cancelled, TextGenerator};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, FinishReason, MessageContent,
    MessageRole, ModelCapabilities, ModelInfo, Usage,
};
use crate::utils::streaming::{capped_api_error, StreamFactory};
use crate::utils::url::{join_url, validate_base_url};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// The vendor requires max_tokens; applied when the caller leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic adapter configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Anthropic chat adapter.
pub struct AnthropicChat {
    config: AnthropicConfig,
    model: ModelInfo,
    http: reqwest::Client,
}

impl AnthropicChat {
    pub fn new(config: AnthropicConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::AuthenticationFailed(
                "no API key resolved for anthropic".to_string(),
            ));
        }
        validate_base_url(&config.base_url)?;
        let model = ModelInfo::new(
            ProviderKind::Anthropic,
            &config.model,
            ModelCapabilities::multimodal(),
        );
        Ok(Self {
            config,
            model,
            http,
        })
    }

    fn request_builder(&self, body: &Value, streaming: bool) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(join_url(&self.config.base_url, "v1/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body);
        if streaming {
            builder = builder.header(reqwest::header::ACCEPT, "text/event-stream");
        }
        builder
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, ClientError> {
        let system: Vec<String> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.all_text())
            .collect();

        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(build_message)
            .collect::<Result<_, _>>()?;

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": stream,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n"));
        }
        if let Some(temperature) = request.params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.params.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(top_k) = request.params.top_k {
            body["top_k"] = json!(top_k);
        }
        if let Some(tools) = &request.tools {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        let function = tool.as_function();
                        json!({
                            "name": function.name,
                            "description": function.description,
                            "input_schema": function.parameters,
                        })
                    })
                    .collect(),
            );
        }
        Ok(body)
    }
}

fn build_message(message: &ChatMessage) -> Result<Value, ClientError> {
    // Tool results travel in user messages on this protocol.
    let role = match message.role {
        MessageRole::Assistant => "assistant",
        MessageRole::User | MessageRole::Tool => "user",
        MessageRole::System => unreachable!("system messages are lifted into the system field"),
    };

    let mut blocks = Vec::new();
    for part in message.content.parts() {
        match part {
            ContentPart::Text { text } => blocks.push(json!({ "type": "text", "text": text })),
            ContentPart::Image { source, media_type } => {
                let block = match source.as_url() {
                    Some(url) => json!({
                        "type": "image",
                        "source": { "type": "url", "url": url }
                    }),
                    None => json!({
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": media_type,
                            "data": source.as_base64().unwrap_or_default(),
                        }
                    }),
                };
                blocks.push(block);
            }
            ContentPart::ToolCall { id, name, arguments } => blocks.push(json!({
                "type": "tool_use",
                "id": id,
                "name": name,
                "input": arguments.into_json(),
            })),
            ContentPart::ToolResult { call_id, output } => blocks.push(json!({
                "type": "tool_result",
                "tool_use_id": call_id,
                "content": match output {
                    ToolArgument::Text(text) => json!(text),
                    other => json!(serde_json::to_string(&other.into_json()).unwrap_or_default()),
                },
            })),
        }
    }
    Ok(json!({ "role": role, "content": blocks }))
}

/// Explicit stop-reason table; unknown values map to `Other`.
pub(crate) fn map_stop_reason(raw: &str) -> FinishReason {
    match raw {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: Option<String>,
    model: Option<String>,
    content: Vec<WireContentBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
    id: Option<String>,
    name: Option<String>,
    input: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

fn parse_response(body: &str) -> Result<ChatResponse, ClientError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::ParseError(format!("malformed anthropic response: {e}")))?;

    let mut response = ChatResponse::empty("anthropic");
    response.id = wire.id;
    response.model = wire.model;
    response.finish_reason = wire.stop_reason.as_deref().map(map_stop_reason);
    response.usage = wire.usage.map(|u| {
        Usage::new(u.input_tokens.unwrap_or(0), u.output_tokens.unwrap_or(0))
    });

    let mut parts = Vec::new();
    for block in wire.content {
        match block.kind.as_str() {
            "text" => {
                if let Some(text) = block.text.filter(|t| !t.is_empty()) {
                    parts.push(ContentPart::text(text));
                }
            }
            "tool_use" => parts.push(ContentPart::tool_call(
                block.id.unwrap_or_default(),
                block.name.unwrap_or_default(),
                ToolArgument::from_json(block.input.unwrap_or(Value::Null)),
            )),
            // Unknown block kinds (e.g. thinking) are dropped, not fatal.
            other => tracing::debug!(target: "llmux::anthropic", kind = other, "skipping content block"),
        }
    }
    response.content = match parts.as_slice() {
        [ContentPart::Text { text }] => MessageContent::Text(text.clone()),
        _ => MessageContent::Parts(parts),
    };
    Ok(response)
}

#[async_trait]
impl TextGenerator for AnthropicChat {
    fn model_info(&self) -> &ModelInfo {
        &self.model
    }

    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let body = self.build_body(&request, false)?;

        let response = self
            .request_builder(&body, false)
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
            self.request_builder(&body, true),
            streaming::AnthropicEventConverter::new(),
            request.cancel.clone(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_lift_into_the_system_field() {
        let chat = AnthropicChat::new(
            AnthropicConfig::new("sk-ant", "claude-sonnet-4-20250514"),
            reqwest::Client::new(),
        )
        .expect("construct");
        let request = ChatRequest::new(vec![
            ChatMessage::system("be brief").build(),
            ChatMessage::user("hi").build(),
        ]);
        let body = chat.build_body(&request, false).expect("body");
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], json!(DEFAULT_MAX_TOKENS));
    }

    #[test]
    fn tool_results_become_user_tool_result_blocks() {
        let message = ChatMessage::tool_result("toolu_1", ToolArgument::Text("18C".into()));
        let wire = build_message(&message).expect("message");
        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"][0]["type"], "tool_result");
        assert_eq!(wire["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn response_parse_maps_stop_reason_and_usage() {
        let body = r#"{
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "Hello"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 8, "output_tokens": 3}
        }"#;
        let response = parse_response(body).expect("parse");
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.expect("usage").total_tokens, 11);
    }

    #[test]
    fn unknown_stop_reason_maps_to_other_not_failure() {
        assert_eq!(
            map_stop_reason("pause_turn"),
            FinishReason::Other("pause_turn".into())
        );
    }

    #[test]
    fn missing_api_key_fails_at_construction() {
        let err = AnthropicChat::new(
            AnthropicConfig::new("", "claude-sonnet-4-20250514"),
            reqwest::Client::new(),
        )
        .err().unwrap();
        assert!(matches!(err, ClientError::AuthenticationFailed(_)));
    }
}
