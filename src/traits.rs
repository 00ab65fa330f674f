//! Capability traits implemented by the provider adapters.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::stream::{ChatStream, ChatStreamHandle};
use crate::types::{
    ChatRequest, ChatResponse, ModelInfo, SpeechRequest, Transcription, TranscriptionRequest,
};
use crate::utils::cancel::CancelHandle;

/// Text generation: the capability set `{generate_text, stream_text}`.
///
/// Adapters hold no mutable state after construction and are safe for
/// concurrent reuse across many simultaneous requests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// The model this adapter was constructed for.
    fn model_info(&self) -> &ModelInfo;

    /// Issue a unary request and return the complete response.
    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError>;

    /// Issue a streaming request. Errors after production has begun
    /// surface as a terminal failure of the stream rather than a thrown
    /// value.
    async fn stream_text(&self, request: ChatRequest) -> Result<ChatStream, ClientError>;

    /// Like [`stream_text`](Self::stream_text), returning the handle that
    /// cancels the stream at the next chunk boundary.
    async fn stream_text_with_cancel(
        &self,
        request: ChatRequest,
    ) -> Result<ChatStreamHandle, ClientError> {
        let cancel = request.cancel.clone().unwrap_or_default();
        let mut request = request;
        request.cancel = Some(cancel.clone());
        let stream = self.stream_text(request).await?;
        Ok(ChatStreamHandle { stream, cancel })
    }
}

/// Speech-to-text over one piece of audio.
#[async_trait]
pub trait TranscriptionCapability: Send + Sync {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcription, ClientError>;
}

/// Text-to-speech for one utterance, returning raw audio bytes.
#[async_trait]
pub trait SpeechCapability: Send + Sync {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Vec<u8>, ClientError>;
}

/// Shared construction-time guard: a request must not already be cancelled
/// when the adapter issues the call.
pub(crate) fn check_not_cancelled(cancel: Option<&CancelHandle>) -> Result<(), ClientError> {
    if cancel.is_some_and(CancelHandle::is_cancelled) {
        return Err(ClientError::StreamError("cancelled by caller".to_string()));
    }
    Ok(())
}
