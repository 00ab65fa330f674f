//! Provider adapters: one per vendor, each translating the unified model
//! to and from that vendor's wire protocol.

pub mod anthropic;
pub mod azure;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod openai_compatible;
pub mod replicate;
pub mod xai;

use serde::{Deserialize, Serialize};

use crate::config::ConfigProvider;
use crate::error::ClientError;
use crate::traits::TextGenerator;

/// Vendor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Grok,
    Ollama,
    AzureOpenAi,
    Replicate,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Gemini => write!(f, "gemini"),
            Self::Grok => write!(f, "grok"),
            Self::Ollama => write!(f, "ollama"),
            Self::AzureOpenAi => write!(f, "azure-openai"),
            Self::Replicate => write!(f, "replicate"),
        }
    }
}

impl ProviderKind {
    /// Construct a ProviderKind from a provider name string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "gemini" | "google" => Some(Self::Gemini),
            "grok" | "xai" => Some(Self::Grok),
            "ollama" => Some(Self::Ollama),
            "azure-openai" | "azure" => Some(Self::AzureOpenAi),
            "replicate" => Some(Self::Replicate),
            _ => None,
        }
    }
}

/// Build a text-generation adapter for a vendor.
///
/// Credentials and endpoint overrides are resolved through `config`;
/// construction fails with `AuthenticationFailed` when a required key is
/// missing and `InvalidConfiguration` when the endpoint is malformed.
pub fn build_text_generator(
    kind: ProviderKind,
    model: &str,
    config: &dyn ConfigProvider,
    http: reqwest::Client,
) -> Result<Box<dyn TextGenerator>, ClientError> {
    let api_key = config.api_key(kind);
    let base_url = config.base_url(kind);
    match kind {
        ProviderKind::OpenAi => {
            let mut cfg = openai::OpenAiConfig::new(api_key.unwrap_or_default(), model);
            if let Some(url) = base_url {
                cfg = cfg.with_base_url(url);
            }
            Ok(Box::new(openai::OpenAiChat::new(cfg, http)?))
        }
        ProviderKind::Anthropic => {
            let mut cfg = anthropic::AnthropicConfig::new(api_key.unwrap_or_default(), model);
            if let Some(url) = base_url {
                cfg = cfg.with_base_url(url);
            }
            Ok(Box::new(anthropic::AnthropicChat::new(cfg, http)?))
        }
        ProviderKind::Gemini => {
            let mut cfg = gemini::GeminiConfig::new(api_key.unwrap_or_default(), model);
            if let Some(url) = base_url {
                cfg = cfg.with_base_url(url);
            }
            Ok(Box::new(gemini::GeminiChat::new(cfg, http)?))
        }
        ProviderKind::Grok => {
            let mut cfg = xai::XaiConfig::new(api_key.unwrap_or_default(), model);
            if let Some(url) = base_url {
                cfg = cfg.with_base_url(url);
            }
            Ok(Box::new(xai::XaiChat::new(cfg, http)?))
        }
        ProviderKind::Ollama => {
            let mut cfg = ollama::OllamaConfig::new(model);
            if let Some(url) = base_url {
                cfg = cfg.with_base_url(url);
            }
            Ok(Box::new(ollama::OllamaChat::new(cfg, http)?))
        }
        ProviderKind::AzureOpenAi => {
            let base = base_url.ok_or_else(|| {
                ClientError::InvalidConfiguration(
                    "Azure OpenAI requires a resource endpoint URL".to_string(),
                )
            })?;
            let cfg = azure::AzureConfig::new(api_key.unwrap_or_default(), base, model);
            Ok(Box::new(azure::AzureOpenAiChat::new(cfg, http)?))
        }
        ProviderKind::Replicate => {
            let mut cfg = replicate::ReplicateConfig::new(api_key.unwrap_or_default(), model);
            if let Some(url) = base_url {
                cfg = cfg.with_base_url(url);
            }
            Ok(Box::new(replicate::ReplicateChat::new(cfg, http)?))
        }
    }
}
