//! Common streaming infrastructure.
//!
//! Providers speak one of three wire shapes: Server-Sent-Event frames,
//! newline-delimited JSON objects, or a single buffered body. The factory
//! here turns the first two into a [`ChatStream`], leaving per-vendor frame
//! interpretation to a converter. The factory owns the invariants the
//! converters cannot: exactly one `Done` terminates every stream, nothing
//! is emitted after termination, and error items are terminal.

use async_stream::stream;
use eventsource_stream::{Event, Eventsource};
use futures_util::StreamExt;

use crate::error::ClientError;
use crate::stream::{ChatStream, StreamEvent};
use crate::utils::cancel::CancelHandle;

/// Ceiling on how much of a non-2xx response body is buffered before
/// truncation, bounding memory on pathological error pages.
pub const ERROR_BODY_CAP: usize = 8 * 1024;

/// Marker appended to a truncated error body.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Converts provider-specific SSE frames into unified stream events.
///
/// A converter accumulates per-stream state (usage counters, last-seen
/// finish reason, the open tool call) behind interior mutability so the
/// factory can drive it from a plain event loop.
pub trait SseEventConverter: Send + Sync {
    /// Convert one SSE frame into zero or more events.
    ///
    /// Returning an `Err` item terminates the stream; returning an empty
    /// vec skips the frame. Which of the two a malformed frame produces is
    /// a per-adapter policy documented on the converter.
    fn convert_event(&self, event: Event) -> Vec<Result<StreamEvent, ClientError>>;

    /// Called once at stream close (or on the `[DONE]` sentinel) when no
    /// terminal event has been emitted yet. Synthesizes the trailing
    /// events, usually a `Done` carrying accumulated usage.
    fn finish(&self) -> Vec<Result<StreamEvent, ClientError>> {
        Vec::new()
    }
}

/// Converts newline-delimited JSON objects into unified stream events.
pub trait JsonEventConverter: Send + Sync {
    /// Convert one complete JSON line into zero or more events.
    fn convert_json(&self, json_data: &str) -> Vec<Result<StreamEvent, ClientError>>;

    /// Same contract as [`SseEventConverter::finish`].
    fn finish(&self) -> Vec<Result<StreamEvent, ClientError>> {
        Vec::new()
    }
}

/// Stream factory for creating provider-specific streams.
pub struct StreamFactory;

impl StreamFactory {
    /// Create a chat stream over an SSE response.
    pub async fn eventsource_stream<C>(
        request_builder: reqwest::RequestBuilder,
        converter: C,
        cancel: Option<CancelHandle>,
    ) -> Result<ChatStream, ClientError>
    where
        C: SseEventConverter + 'static,
    {
        let response = request_builder
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to send request: {e}")))?;

        if !response.status().is_success() {
            return Err(capped_api_error(response).await);
        }

        let byte_stream = response.bytes_stream();
        let s = stream! {
            let mut events = Box::pin(byte_stream.eventsource());
            let mut terminated = false;

            'outer: while let Some(item) = events.next().await {
                if let Some(handle) = &cancel {
                    if handle.is_cancelled() {
                        yield Err(ClientError::StreamError("cancelled by caller".to_string()));
                        return;
                    }
                }

                let frame = match item {
                    Ok(frame) => frame,
                    Err(e) => {
                        yield Err(ClientError::StreamError(format!("SSE transport error: {e}")));
                        return;
                    }
                };

                let data = frame.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break;
                }

                tracing::debug!(target: "llmux::stream", frame = %frame.data, "sse frame");
                for out in converter.convert_event(frame) {
                    let is_terminal = out.as_ref().map(StreamEvent::is_done).unwrap_or(true);
                    yield out;
                    if is_terminal {
                        terminated = true;
                        break 'outer;
                    }
                }
            }

            if !terminated {
                for out in converter.finish() {
                    let is_terminal = out.as_ref().map(StreamEvent::is_done).unwrap_or(true);
                    yield out;
                    if is_terminal {
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }

    /// Create a chat stream over a newline-delimited JSON response.
    ///
    /// Maintains a partial-line buffer across chunk boundaries; a trailing
    /// unterminated line is fed to the converter at stream close.
    pub async fn ndjson_stream<C>(
        request_builder: reqwest::RequestBuilder,
        converter: C,
        cancel: Option<CancelHandle>,
    ) -> Result<ChatStream, ClientError>
    where
        C: JsonEventConverter + 'static,
    {
        let response = request_builder
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("failed to send request: {e}")))?;

        if !response.status().is_success() {
            return Err(capped_api_error(response).await);
        }

        let mut byte_stream = Box::pin(response.bytes_stream());
        let s = stream! {
            let mut buffer = String::new();
            let mut terminated = false;

            'outer: while let Some(chunk) = byte_stream.next().await {
                if let Some(handle) = &cancel {
                    if handle.is_cancelled() {
                        yield Err(ClientError::StreamError("cancelled by caller".to_string()));
                        return;
                    }
                }

                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ClientError::NetworkError(format!("stream error: {e}")));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    for out in converter.convert_json(line) {
                        let is_terminal = out.as_ref().map(StreamEvent::is_done).unwrap_or(true);
                        yield out;
                        if is_terminal {
                            terminated = true;
                            break 'outer;
                        }
                    }
                }
            }

            if !terminated && !buffer.trim().is_empty() {
                for out in converter.convert_json(buffer.trim()) {
                    let is_terminal = out.as_ref().map(StreamEvent::is_done).unwrap_or(true);
                    yield out;
                    if is_terminal {
                        terminated = true;
                        break;
                    }
                }
            }

            if !terminated {
                for out in converter.finish() {
                    let is_terminal = out.as_ref().map(StreamEvent::is_done).unwrap_or(true);
                    yield out;
                    if is_terminal {
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }
}

/// Read a non-2xx response body into an `ApiError`, buffering at most
/// [`ERROR_BODY_CAP`] bytes before truncating with a marker.
pub async fn capped_api_error(response: reqwest::Response) -> ClientError {
    let code = response.status().as_u16();
    let mut body = String::new();
    let mut truncated = false;
    let mut byte_stream = Box::pin(response.bytes_stream());

    while let Some(Ok(chunk)) = byte_stream.next().await {
        body.push_str(&String::from_utf8_lossy(&chunk));
        if body.len() > ERROR_BODY_CAP {
            truncate_at_char_boundary(&mut body, ERROR_BODY_CAP);
            body.push_str(TRUNCATION_MARKER);
            truncated = true;
            break;
        }
    }

    let details: Option<serde_json::Value> = if truncated {
        None
    } else {
        serde_json::from_str(&body).ok()
    };

    // OpenAI-style bodies carry an explicit code for unknown models.
    if let Some(details) = &details {
        if details.pointer("/error/code").and_then(|v| v.as_str()) == Some("model_not_found") {
            let message = details
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .unwrap_or("model not found");
            return ClientError::ModelNotFound(message.to_string());
        }
    }

    ClientError::ApiError {
        code,
        message: body,
        details,
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let mut s = "héllo wörld".repeat(10);
        truncate_at_char_boundary(&mut s, 7);
        assert!(s.len() <= 7);
        assert!(s.starts_with("héllo"));
    }
}
