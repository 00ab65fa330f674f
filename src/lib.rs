//! # llmux
//!
//! A unified, multiplexing client for LLM provider APIs: one
//! request/response/event model, one error taxonomy, and one streaming
//! surface across vendors with very different wire protocols.
//!
//! ## Example
//!
//! ```rust,no_run
//! use llmux::prelude::*;
//!
//! # async fn run() -> Result<(), llmux::error::ClientError> {
//! let config = StaticConfig::new()
//!     .with_api_key(ProviderKind::OpenAi, std::env::var("OPENAI_API_KEY").unwrap());
//! let model = build_text_generator(
//!     ProviderKind::OpenAi,
//!     "gpt-4o-mini",
//!     &config,
//!     reqwest::Client::new(),
//! )?;
//!
//! let request = ChatRequest::builder()
//!     .message(ChatMessage::user("Why is the sky blue?").build())
//!     .build();
//! let response = model.generate_text(request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod argument;
pub mod batch;
pub mod config;
pub mod error;
pub mod mcp;
pub mod providers;
pub mod stream;
pub mod traits;
pub mod types;
pub mod utils;

pub use argument::ToolArgument;
pub use batch::run_batch;
pub use config::{ConfigProvider, StaticConfig};
pub use error::ClientError;
pub use providers::{build_text_generator, ProviderKind};
pub use stream::{collect_response, ChatStream, ChatStreamHandle, StreamEvent};
pub use traits::{SpeechCapability, TextGenerator, TranscriptionCapability};

/// Common imports for applications.
pub mod prelude {
    pub use crate::argument::ToolArgument;
    pub use crate::batch::run_batch;
    pub use crate::config::{ConfigProvider, StaticConfig};
    pub use crate::error::ClientError;
    pub use crate::providers::{build_text_generator, ProviderKind};
    pub use crate::stream::{collect_response, ChatStream, StreamEvent};
    pub use crate::traits::{SpeechCapability, TextGenerator, TranscriptionCapability};
    pub use crate::types::{
        ChatMessage, ChatRequest, ChatResponse, ContentPart, FinishReason, GenerationParams,
        MediaSource, MessageContent, MessageRole, ModelInfo, SpeechRequest, Tool, Transcription,
        TranscriptionRequest, Usage,
    };
    pub use crate::utils::cancel::CancelHandle;
}
