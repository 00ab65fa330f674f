//! Unified request/response types shared by all provider adapters.

mod audio;
mod message;
mod model;
mod request;
mod response;
mod tools;

pub use audio::{SpeechRequest, Transcription, TranscriptionRequest};
pub use message::{ChatMessage, ChatMessageBuilder, ContentPart, MediaSource, MessageContent, MessageRole};
pub use model::{ModelCapabilities, ModelInfo};
pub use request::{ChatRequest, ChatRequestBuilder, GenerationParams};
pub use response::{ChatResponse, FinishReason, Usage};
pub use tools::{Tool, ToolFunction};
