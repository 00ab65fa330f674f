//! OpenAI adapter: chat completions, the responses API, transcription,
//! and speech.

mod audio;
pub mod responses;

pub use responses::OpenAiResponses;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::providers::openai_compatible::OpenAiCompatible;
use crate::providers::ProviderKind;
use crate::stream::ChatStream;
use crate::traits::TextGenerator;
use crate::types::{ChatRequest, ChatResponse, ModelCapabilities, ModelInfo};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI adapter configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub organization: Option<String>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            organization: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

/// OpenAI chat-completions adapter.
///
/// Composes the shared OpenAI-compatible client; also carries the audio
/// capabilities (`audio/transcriptions`, `audio/speech`).
pub struct OpenAiChat {
    config: OpenAiConfig,
    inner: OpenAiCompatible,
    http: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        let model = ModelInfo::new(
            ProviderKind::OpenAi,
            &config.model,
            ModelCapabilities::multimodal(),
        );
        let mut inner = OpenAiCompatible::new(
            model,
            &config.api_key,
            &config.base_url,
            http.clone(),
        )?;
        if let Some(org) = &config.organization {
            inner = inner.with_header("OpenAI-Organization", org);
        }
        Ok(Self {
            config,
            inner,
            http,
        })
    }

    pub(crate) fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl TextGenerator for OpenAiChat {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_fails_at_construction() {
        let err = OpenAiChat::new(
            OpenAiConfig::new("", "gpt-4o-mini"),
            reqwest::Client::new(),
        )
        .err().unwrap();
        assert!(matches!(err, ClientError::AuthenticationFailed(_)));
    }

    #[test]
    fn malformed_base_url_fails_at_construction() {
        let err = OpenAiChat::new(
            OpenAiConfig::new("sk-test", "gpt-4o-mini").with_base_url("nope"),
            reqwest::Client::new(),
        )
        .err().unwrap();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }
}
