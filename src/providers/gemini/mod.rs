//! Google Gemini adapter.
//!
//! The vendor's REST surface is stream-first, so `generate_text` is
//! derived by fully draining `stream_text` and folding the events into a
//! single response.

pub mod streaming;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::argument::ToolArgument;
use crate::error::ClientError;
use crate::providers::ProviderKind;
use crate::stream::{collect_response, ChatStream};
use crate::traits::{check_not_cancelled, TextGenerator};
use crate::types::{
    ChatRequest, ChatResponse, ContentPart, FinishReason, MessageRole, ModelCapabilities,
    ModelInfo,
};
use crate::utils::streaming::StreamFactory;
use crate::utils::url::{join_url, validate_base_url};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini adapter configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
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

/// Gemini chat adapter.
pub struct GeminiChat {
    config: GeminiConfig,
    model: ModelInfo,
    http: reqwest::Client,
}

impl GeminiChat {
    pub fn new(config: GeminiConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::AuthenticationFailed(
                "no API key resolved for gemini".to_string(),
            ));
        }
        validate_base_url(&config.base_url)?;
        let model = ModelInfo::new(
            ProviderKind::Gemini,
            &config.model,
            ModelCapabilities::multimodal(),
        );
        Ok(Self {
            config,
            model,
            http,
        })
    }

    fn stream_url(&self) -> String {
        join_url(
            &self.config.base_url,
            &format!("models/{}:streamGenerateContent?alt=sse", self.config.model),
        )
    }

    fn build_body(&self, request: &ChatRequest) -> Result<Value, ClientError> {
        let system: Vec<String> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.all_text())
            .collect();

        let mut contents = Vec::new();
        for message in request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
        {
            // Vendor role naming: assistant turns are "model".
            let role = match message.role {
                MessageRole::Assistant => "model",
                _ => "user",
            };
            let mut parts = Vec::new();
            for part in message.content.parts() {
                match part {
                    ContentPart::Text { text } => parts.push(json!({ "text": text })),
                    ContentPart::Image { source, media_type } => parts.push(json!({
                        "inlineData": {
                            "mimeType": media_type,
                            "data": source.as_base64().unwrap_or_default(),
                        }
                    })),
                    ContentPart::ToolCall { name, arguments, .. } => parts.push(json!({
                        "functionCall": { "name": name, "args": arguments.into_json() }
                    })),
                    ContentPart::ToolResult { call_id, output } => parts.push(json!({
                        "functionResponse": {
                            "name": self.call_name(request, &call_id),
                            "response": wrap_response(output),
                        }
                    })),
                }
            }
            contents.push(json!({ "role": role, "parts": parts }));
        }

        let mut body = json!({ "contents": contents });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n") }] });
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = request.params.temperature {
            generation_config.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = request.params.max_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if let Some(top_p) = request.params.top_p {
            generation_config.insert("topP".into(), json!(top_p));
        }
        if let Some(top_k) = request.params.top_k {
            generation_config.insert("topK".into(), json!(top_k));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        if let Some(tools) = &request.tools {
            body["tools"] = json!([{
                "functionDeclarations": tools
                    .iter()
                    .map(|tool| {
                        let function = tool.as_function();
                        json!({
                            "name": function.name,
                            "description": function.description,
                            "parameters": function.parameters,
                        })
                    })
                    .collect::<Vec<_>>(),
            }]);
        }
        Ok(body)
    }

    /// The vendor matches tool results by function name, not call id; the
    /// name is recovered from the originating call earlier in the
    /// conversation.
    fn call_name(&self, request: &ChatRequest, call_id: &str) -> String {
        for message in &request.messages {
            for part in message.content.parts() {
                if let ContentPart::ToolCall { id, name, .. } = part {
                    if id == call_id {
                        return name;
                    }
                }
            }
        }
        call_id.to_string()
    }
}

fn wrap_response(output: ToolArgument) -> Value {
    // functionResponse.response must be an object.
    match output {
        ToolArgument::Object(_) => output.into_json(),
        other => json!({ "result": other.into_json() }),
    }
}

/// Explicit finish-reason table; unknown values map to `Other`.
pub(crate) fn map_finish_reason(raw: &str) -> FinishReason {
    match raw {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

#[async_trait]
impl TextGenerator for GeminiChat {
    fn model_info(&self) -> &ModelInfo {
        &self.model
    }

    /// Derived by draining the stream; the vendor's REST surface is
    /// stream-first.
    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        let stream = self.stream_text(request).await?;
        let mut response = collect_response(stream, "gemini").await?;
        response.model = Some(self.config.model.clone());
        Ok(response)
    }

    async fn stream_text(&self, request: ChatRequest) -> Result<ChatStream, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let body = self.build_body(&request)?;
        let builder = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body);
        StreamFactory::eventsource_stream(
            builder,
            streaming::GeminiEventConverter::new(),
            request.cancel.clone(),
        )
        .await
    }
}
