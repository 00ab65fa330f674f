//! Ollama adapter.
//!
//! Local daemon, credential-free by design; only the endpoint is
//! validated at construction. Streaming is newline-delimited JSON rather
//! than SSE.

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
    ChatRequest, ChatResponse, ContentPart, FinishReason, MessageContent, MessageRole,
    ModelCapabilities, ModelInfo, Usage,
};
use crate::utils::streaming::{capped_api_error, StreamFactory};
use crate::utils::url::{join_url, validate_base_url};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama adapter configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl OllamaConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Ollama chat adapter.
pub struct OllamaChat {
    config: OllamaConfig,
    model: ModelInfo,
    http: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: OllamaConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        validate_base_url(&config.base_url)?;
        let model = ModelInfo::new(
            ProviderKind::Ollama,
            &config.model,
            ModelCapabilities::chat(),
        );
        Ok(Self {
            config,
            model,
            http,
        })
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, ClientError> {
        let mut messages = Vec::new();
        for message in &request.messages {
            let role = match message.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };
            let mut wire = json!({ "role": role, "content": message.content.all_text() });

            let images: Vec<String> = message
                .content
                .parts()
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Image { source, .. } => source.as_base64(),
                    _ => None,
                })
                .collect();
            if !images.is_empty() {
                wire["images"] = json!(images);
            }

            let tool_calls: Vec<Value> = message
                .content
                .parts()
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::ToolCall { name, arguments, .. } => Some(json!({
                        "function": { "name": name, "arguments": arguments.into_json() }
                    })),
                    _ => None,
                })
                .collect();
            if !tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(tool_calls);
            }

            if message.role == MessageRole::Tool {
                // The daemon expects the result text in content.
                if let Some(ContentPart::ToolResult { output, .. }) =
                    message.content.parts().into_iter().next()
                {
                    wire["content"] = json!(match output {
                        ToolArgument::Text(text) => text,
                        other => serde_json::to_string(&other.into_json()).unwrap_or_default(),
                    });
                }
            }
            messages.push(wire);
        }

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": stream,
        });

        let mut options = serde_json::Map::new();
        if let Some(temperature) = request.params.temperature {
            options.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = request.params.max_tokens {
            options.insert("num_predict".into(), json!(max_tokens));
        }
        if let Some(top_p) = request.params.top_p {
            options.insert("top_p".into(), json!(top_p));
        }
        if let Some(top_k) = request.params.top_k {
            options.insert("top_k".into(), json!(top_k));
        }
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        if let Some(tools) = &request.tools {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        let function = tool.as_function();
                        json!({
                            "type": "function",
                            "function": {
                                "name": function.name,
                                "description": function.description,
                                "parameters": function.parameters,
                            }
                        })
                    })
                    .collect(),
            );
        }
        Ok(body)
    }

    fn request_builder(&self, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(join_url(&self.config.base_url, "api/chat"))
            .json(body)
    }
}

/// Explicit done-reason table; unknown values map to `Other`.
pub(crate) fn map_done_reason(raw: &str) -> FinishReason {
    match raw {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        other => FinishReason::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChatResponse {
    pub model: Option<String>,
    pub message: Option<WireMessage>,
    pub done_reason: Option<String>,
    pub prompt_eval_count: Option<u32>,
    pub eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireToolCall {
    pub function: WireFunction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFunction {
    pub name: String,
    pub arguments: Option<Value>,
}

fn parse_response(body: &str) -> Result<ChatResponse, ClientError> {
    let wire: WireChatResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::ParseError(format!("malformed ollama response: {e}")))?;

    let mut response = ChatResponse::empty("ollama");
    response.model = wire.model;
    response.finish_reason = wire.done_reason.as_deref().map(map_done_reason);
    if let (Some(prompt), Some(eval)) = (wire.prompt_eval_count, wire.eval_count) {
        response.usage = Some(Usage::new(prompt, eval));
    }

    let mut parts = Vec::new();
    if let Some(message) = wire.message {
        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            parts.push(ContentPart::text(text));
        }
        for call in message.tool_calls.unwrap_or_default() {
            // The daemon sends complete calls without ids; synthesize one.
            parts.push(ContentPart::tool_call(
                format!("call_{}", uuid::Uuid::new_v4().simple()),
                call.function.name,
                ToolArgument::from_json(call.function.arguments.unwrap_or(Value::Null)),
            ));
            // done_reason stays "stop" on tool-call turns.
            response.finish_reason = Some(FinishReason::ToolCalls);
        }
    }
    response.content = match parts.as_slice() {
        [ContentPart::Text { text }] => MessageContent::Text(text.clone()),
        _ => MessageContent::Parts(parts),
    };
    Ok(response)
}

#[async_trait]
impl TextGenerator for OllamaChat {
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
        StreamFactory::ndjson_stream(
            self.request_builder(&body),
            streaming::OllamaEventConverter::new(),
            request.cancel.clone(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[test]
    fn construction_requires_no_credential() {
        let chat = OllamaChat::new(OllamaConfig::new("llama3.2"), reqwest::Client::new());
        assert!(chat.is_ok());
    }

    #[test]
    fn params_nest_under_options() {
        let chat = OllamaChat::new(OllamaConfig::new("llama3.2"), reqwest::Client::new()).unwrap();
        let request = ChatRequest::builder()
            .message(ChatMessage::user("hi").build())
            .temperature(0.5)
            .max_tokens(99)
            .build();
        let body = chat.build_body(&request, true).expect("body");
        assert_eq!(body["options"]["temperature"], json!(0.5));
        assert_eq!(body["options"]["num_predict"], json!(99));
        assert_eq!(body["stream"], json!(true));
    }

    #[test]
    fn buffered_response_parses_usage_and_reason() {
        let body = r#"{
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Hi there"},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 11,
            "eval_count": 4
        }"#;
        let response = parse_response(body).expect("parse");
        assert_eq!(response.text(), "Hi there");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.expect("usage").total_tokens, 15);
    }
}
