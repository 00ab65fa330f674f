//! Model identifier and capability flags.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderKind;

/// Capability flags advertised by a model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub vision: bool,
    pub tools: bool,
    pub streaming: bool,
}

impl ModelCapabilities {
    /// Text-only, tool-capable, streaming model - the common case.
    pub const fn chat() -> Self {
        Self {
            vision: false,
            tools: true,
            streaming: true,
        }
    }

    /// Full multimodal capability set.
    pub const fn multimodal() -> Self {
        Self {
            vision: true,
            tools: true,
            streaming: true,
        }
    }

    pub const fn with_vision(mut self, vision: bool) -> Self {
        self.vision = vision;
        self
    }

    pub const fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Immutable model identifier, constructed at adapter init.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    /// Owning vendor
    pub provider: ProviderKind,
    /// Vendor model name (e.g. "gpt-4o-mini")
    pub id: String,
    pub capabilities: ModelCapabilities,
    /// Context window in tokens, when the vendor publishes one
    pub context_window: Option<u32>,
    /// Maximum output tokens, when the vendor publishes one
    pub max_output_tokens: Option<u32>,
}

impl ModelInfo {
    pub fn new(provider: ProviderKind, id: impl Into<String>, capabilities: ModelCapabilities) -> Self {
        Self {
            provider,
            id: id.into(),
            capabilities,
            context_window: None,
            max_output_tokens: None,
        }
    }

    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = Some(tokens);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

impl std::fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.id)
    }
}
