//! Grok (xAI) adapter: the OpenAI-compatible protocol at the xAI
//! endpoint, bearer auth.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::providers::openai_compatible::OpenAiCompatible;
use crate::providers::ProviderKind;
use crate::stream::ChatStream;
use crate::traits::TextGenerator;
use crate::types::{ChatRequest, ChatResponse, ModelCapabilities, ModelInfo};

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// Grok adapter configuration.
#[derive(Debug, Clone)]
pub struct XaiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl XaiConfig {
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

/// Grok chat adapter.
pub struct XaiChat {
    inner: OpenAiCompatible,
}

impl XaiChat {
    pub fn new(config: XaiConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        let model = ModelInfo::new(
            ProviderKind::Grok,
            &config.model,
            ModelCapabilities::multimodal(),
        );
        let inner = OpenAiCompatible::new(model, config.api_key, config.base_url, http)?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl TextGenerator for XaiChat {
    fn model_info(&self) -> &ModelInfo {
        self.inner.model_info()
    }

    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        self.inner.generate_text(request).await
    }

    async fn stream_text(&self, request: ChatRequest) -> Result<ChatStream, ClientError> {
        self.inner.stream_text(request).await
    }
}
