//! Transcription and speech request types.

use serde::{Deserialize, Serialize};

/// A request to transcribe one piece of audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    /// Raw audio bytes
    #[serde(skip)]
    pub audio: Vec<u8>,
    /// Filename hint; also drives mime-type detection for multipart uploads
    pub filename: String,
    /// Optional BCP-47 language hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Optional prompt to bias decoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(audio: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            audio,
            filename: filename.into(),
            language: None,
            prompt: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// A completed transcription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcription {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Audio duration in seconds when the vendor reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
}

/// A request to synthesize one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub input: String,
    pub voice: String,
    /// Output container (e.g. "mp3", "wav"); vendor default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SpeechRequest {
    pub fn new(input: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            voice: voice.into(),
            format: None,
        }
    }
}
