//! OpenAI audio capabilities: multipart transcription and JSON speech
//! synthesis.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::ClientError;
use crate::traits::{SpeechCapability, TranscriptionCapability};
use crate::types::{SpeechRequest, Transcription, TranscriptionRequest};
use crate::utils::streaming::capped_api_error;
use crate::utils::url::join_url;

use super::OpenAiChat;

#[derive(Debug, Deserialize)]
struct WireTranscription {
    text: String,
    language: Option<String>,
    duration: Option<f32>,
}

#[async_trait]
impl TranscriptionCapability for OpenAiChat {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcription, ClientError> {
        let mime = mime_guess::from_path(&request.filename)
            .first_or_octet_stream()
            .to_string();
        let file = Part::bytes(request.audio)
            .file_name(request.filename.clone())
            .mime_str(&mime)
            .map_err(|e| ClientError::InvalidInput(format!("invalid audio mime type: {e}")))?;

        let mut form = Form::new()
            .part("file", file)
            .text("model", self.config().model.clone());
        if let Some(language) = request.language {
            form = form.text("language", language);
        }
        if let Some(prompt) = request.prompt {
            form = form.text("prompt", prompt);
        }

        let response = self
            .http()
            .post(join_url(&self.config().base_url, "audio/transcriptions"))
            .bearer_auth(&self.config().api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to send request: {e}")))?;
        if !response.status().is_success() {
            return Err(capped_api_error(response).await);
        }

        let wire: WireTranscription = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("malformed transcription response: {e}")))?;
        if wire.text.trim().is_empty() {
            return Err(ClientError::TranscriptionFailed(
                "response decoded but carried no text".to_string(),
            ));
        }
        Ok(Transcription {
            text: wire.text,
            language: wire.language,
            duration: wire.duration,
        })
    }
}

#[async_trait]
impl SpeechCapability for OpenAiChat {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Vec<u8>, ClientError> {
        let mut body = serde_json::json!({
            "model": self.config().model,
            "input": request.input,
            "voice": request.voice,
        });
        if let Some(format) = request.format {
            body["response_format"] = serde_json::json!(format);
        }

        let response = self
            .http()
            .post(join_url(&self.config().base_url, "audio/speech"))
            .bearer_auth(&self.config().api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to send request: {e}")))?;
        if !response.status().is_success() {
            return Err(capped_api_error(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to read audio: {e}")))?;
        if bytes.is_empty() {
            return Err(ClientError::SpeechFailed(
                "response decoded but carried no audio".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
