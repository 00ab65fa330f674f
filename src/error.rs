//! Error taxonomy shared by every provider adapter.
//!
//! Adapters map vendor-specific failures onto exactly one of these kinds;
//! no adapter defines error types of its own.

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable credential was resolvable at adapter construction time
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The computed endpoint or another construction-time setting is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller supplied a request the adapter cannot translate
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The vendor rejected the request with a non-2xx HTTP result
    #[error("API error {code}: {message}")]
    ApiError {
        /// HTTP status code (0 when the failure arrived inside a stream body)
        code: u16,
        /// Vendor error body, capped by the streaming layer
        message: String,
        /// Structured vendor error payload when one could be decoded
        details: Option<serde_json::Value>,
    },

    /// Transport-level failure (connect, send, receive)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The adapter does not implement a capability it otherwise advertises
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The requested model is unknown to the vendor
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The transcription response decoded but carried no usable text
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// The speech response decoded but carried no usable audio
    #[error("Speech synthesis failed: {0}")]
    SpeechFailed(String),

    /// A wire payload could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A streaming response terminated abnormally
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl ClientError {
    /// Build an `ApiError` from a status code and captured body.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// True when the error came from the vendor rather than this library.
    pub const fn is_vendor_error(&self) -> bool {
        matches!(self, Self::ApiError { .. } | Self::ModelNotFound(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_carries_status_and_body() {
        let err = ClientError::api_error(429, "rate limited");
        assert_eq!(err.to_string(), "API error 429: rate limited");
        assert!(err.is_vendor_error());
    }

    #[test]
    fn network_error_is_not_a_vendor_error() {
        let err = ClientError::NetworkError("connection reset".into());
        assert!(!err.is_vendor_error());
    }
}
