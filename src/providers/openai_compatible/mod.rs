//! Shared client for vendors speaking the OpenAI chat-completions
//! protocol.
//!
//! The concrete OpenAI, Grok, and Azure adapters compose this client
//! rather than re-implementing the wire format; each contributes its own
//! endpoint, auth scheme, and defaults.

pub mod protocol;
pub mod streaming;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};

use crate::error::ClientError;
use crate::stream::ChatStream;
use crate::traits::{check_not_cancelled, TextGenerator};
use crate::types::{ChatRequest, ChatResponse, ModelInfo};
use crate::utils::streaming::{capped_api_error, StreamFactory};
use crate::utils::url::{join_url, validate_base_url};

use self::streaming::ChatCompletionsEventConverter;

/// How the vendor expects its credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// A custom header, e.g. Azure's `api-key`
    Header(&'static str),
}

/// A configured OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatible {
    api_key: String,
    base_url: String,
    chat_path: String,
    query: Vec<(String, String)>,
    auth: AuthScheme,
    extra_headers: Vec<(String, String)>,
    model: ModelInfo,
    http: reqwest::Client,
}

impl OpenAiCompatible {
    /// Construct and validate a compatible client.
    ///
    /// Fails with `AuthenticationFailed` when the key is empty and
    /// `InvalidConfiguration` when the base URL is malformed - at
    /// construction, not at call time.
    pub fn new(
        model: ModelInfo,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        let base_url = base_url.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::AuthenticationFailed(format!(
                "no API key resolved for {}",
                model.provider
            )));
        }
        validate_base_url(&base_url)?;
        Ok(Self {
            api_key,
            base_url,
            chat_path: "chat/completions".to_string(),
            query: Vec::new(),
            auth: AuthScheme::Bearer,
            extra_headers: Vec::new(),
            model,
            http,
        })
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    fn headers(&self, streaming: bool) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(&match self.auth {
            AuthScheme::Bearer => format!("Bearer {}", self.api_key),
            AuthScheme::Header(_) => self.api_key.clone(),
        })
        .map_err(|e| ClientError::InvalidConfiguration(format!("invalid API key: {e}")))?;
        match self.auth {
            AuthScheme::Bearer => headers.insert(reqwest::header::AUTHORIZATION, key_value),
            AuthScheme::Header(name) => headers.insert(HeaderName::from_static(name), key_value),
        };
        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidConfiguration(format!("invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::InvalidConfiguration(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }
        if streaming {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }
        Ok(headers)
    }

    fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    fn request_builder(
        &self,
        body: &serde_json::Value,
        streaming: bool,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        Ok(self
            .http
            .post(self.chat_url())
            .query(&self.query)
            .headers(self.headers(streaming)?)
            .json(body))
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatible {
    fn model_info(&self) -> &ModelInfo {
        &self.model
    }

    async fn generate_text(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let body = protocol::build_chat_body(&self.model.id, &request, false)?;

        let response = self
            .request_builder(&body, false)?
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to send request: {e}")))?;
        if !response.status().is_success() {
            return Err(capped_api_error(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to read response: {e}")))?;
        protocol::parse_chat_response(&self.model.provider.to_string(), &text)
    }

    async fn stream_text(&self, request: ChatRequest) -> Result<ChatStream, ClientError> {
        check_not_cancelled(request.cancel.as_ref())?;
        let mut body = protocol::build_chat_body(&self.model.id, &request, true)?;
        body["stream_options"] = serde_json::json!({ "include_usage": true });

        let converter = ChatCompletionsEventConverter::new(self.model.provider.to_string());
        StreamFactory::eventsource_stream(
            self.request_builder(&body, true)?,
            converter,
            request.cancel.clone(),
        )
        .await
    }
}
