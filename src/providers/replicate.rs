//! Replicate adapter.
//!
//! The predictions API is unary: the call is issued with `Prefer: wait`
//! and the output arrives in one buffered JSON body. Streaming is
//! advertised but not implemented by this adapter; `stream_text` surfaces
//! `UnsupportedOperation`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::providers::ProviderKind;
use crate::stream::ChatStream;
use crate::traits::{check_not_cancelled, TextGenerator};
use crate::types::{
    ChatRequest, ChatResponse, FinishReason, MessageContent, MessageRole, ModelCapabilities,
    ModelInfo,
};
use crate::utils::streaming::capped_api_error;
use crate::utils::url::{join_url, validate_base_url};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Replicate adapter configuration.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_key: String,
    pub base_url: String,
    /// "{owner}/{name}" model reference
    pub model: String,
}

impl ReplicateConfig {
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

/// Replicate chat adapter.
pub struct ReplicateChat {
    config: ReplicateConfig,
    model: ModelInfo,
    http: reqwest::Client,
}

impl ReplicateChat {
    pub fn new(config: ReplicateConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::AuthenticationFailed(
                "no API key resolved for replicate".to_string(),
            ));
        }
        validate_base_url(&config.base_url)?;
        let model = ModelInfo::new(
            ProviderKind::Replicate,
            &config.model,
            ModelCapabilities::chat().with_streaming(false),
        );
        Ok(Self {
            config,
            model,
            http,
        })
    }

    /// Flatten the conversation into the prompt/system_prompt inputs the
    /// language-model predictions expect.
    fn build_body(&self, request: &ChatRequest) -> Value {
        let system: Vec<String> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.all_text())
            .collect();
        let prompt: Vec<String> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| m.content.all_text())
            .collect();

        let mut input = json!({ "prompt": prompt.join("\n") });
        if !system.is_empty() {
            input["system_prompt"] = json!(system.join("\n"));
        }
        if let Some(temperature) = request.params.temperature {
            input["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.params.max_tokens {
            input["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = request.params.top_p {
            input["top_p"] = json!(top_p);
        }
        if let Some(top_k) = request.params.top_k {
            input["top_k"] = json!(top_k);
        }
        json!({ "input": input })
    }
}

#[derive(Debug, Deserialize)]
struct WirePrediction {
    id: Option<String>,
    status: Option<String>,
    output: Option<Value>,
    error: Option<Value>,
}

fn output_text(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn parse_prediction(body: &str) -> Result<ChatResponse, ClientError> {
    let wire: WirePrediction = serde_json::from_str(body)
        .map_err(|e| ClientError::ParseError(format!("malformed replicate response: {e}")))?;

    if let Some(error) = wire.error.filter(|e| !e.is_null()) {
        return Err(ClientError::ApiError {
            code: 0,
            message: format!("prediction failed: {error}"),
            details: Some(error),
        });
    }

    let mut response = ChatResponse::empty("replicate");
    response.id = wire.id;
    response.finish_reason = Some(match wire.status.as_deref() {
        Some("succeeded") | None => FinishReason::Stop,
        Some(other) => FinishReason::Other(other.to_string()),
    });
    response.content = MessageContent::Text(
        wire.output.as_ref().map(output_text).unwrap_or_default(),
    );
    Ok(response)
}

#[async_trait]
impl TextGenerator for ReplicateChat {
    fn model_info(&self) -> &ModelInfo {
        &self.model
    }

    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let body = self.build_body(&request);
        let url = join_url(
            &self.config.base_url,
            &format!("models/{}/predictions", self.config.model),
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Prefer", "wait")
            .json(&body)
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
        parse_prediction(&text)
    }

    async fn stream_text(&self, _request: ChatRequest) -> Result<ChatStream, ClientError> {
        Err(ClientError::UnsupportedOperation(
            "replicate adapter does not implement streaming".to_string(),
        ))
    }
}
