//! Azure OpenAI adapter: the OpenAI-compatible protocol under
//! deployment-based URLs, `api-key` header auth, and a mandatory
//! `api-version` query parameter.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::providers::openai_compatible::{AuthScheme, OpenAiCompatible};
use crate::providers::ProviderKind;
use crate::stream::ChatStream;
use crate::traits::TextGenerator;
use crate::types::{ChatRequest, ChatResponse, ModelCapabilities, ModelInfo};

const DEFAULT_API_VERSION: &str = "2024-10-21";

/// Azure OpenAI adapter configuration.
///
/// `endpoint` is the resource URL, typically
/// `https://{resource}.openai.azure.com`; the model doubles as the
/// deployment id.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

impl AzureConfig {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }
}

/// Azure OpenAI chat adapter.
pub struct AzureOpenAiChat {
    inner: OpenAiCompatible,
}

impl AzureOpenAiChat {
    pub fn new(config: AzureConfig, http: reqwest::Client) -> Result<Self, ClientError> {
        let model = ModelInfo::new(
            ProviderKind::AzureOpenAi,
            &config.deployment,
            ModelCapabilities::multimodal(),
        );
        let inner = OpenAiCompatible::new(model, config.api_key, config.endpoint, http)?
            .with_auth(AuthScheme::Header("api-key"))
            .with_chat_path(format!(
                "openai/deployments/{}/chat/completions",
                config.deployment
            ))
            .with_query("api-version", config.api_version);
        Ok(Self { inner })
    }
}

#[async_trait]
impl TextGenerator for AzureOpenAiChat {
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
        let err = AzureOpenAiChat::new(
            AzureConfig::new("", "https://res.openai.azure.com", "gpt-4o"),
            reqwest::Client::new(),
        )
        .err().unwrap();
        assert!(matches!(err, ClientError::AuthenticationFailed(_)));
    }

    #[test]
    fn malformed_endpoint_fails_at_construction() {
        let err = AzureOpenAiChat::new(
            AzureConfig::new("key", "res.openai.azure.com", "gpt-4o"),
            reqwest::Client::new(),
        )
        .err().unwrap();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }
}
