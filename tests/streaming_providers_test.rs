//! Streaming normalization tests across wire shapes: Anthropic SSE,
//! Gemini SSE, and Ollama NDJSON, all against a mock server.

use futures_util::StreamExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use llmux::prelude::*;
use llmux::providers::anthropic::{AnthropicChat, AnthropicConfig};
use llmux::providers::gemini::{GeminiChat, GeminiConfig};
use llmux::providers::ollama::{OllamaChat, OllamaConfig};

async fn collect(mut stream: ChatStream) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.expect("stream event"));
    }
    events
}

fn text_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::TextDelta { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn anthropic_sse_stream_normalizes() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":9}}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello \"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"world\"}}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":3}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let adapter = AnthropicChat::new(
        AnthropicConfig::new("sk-ant-test", "claude-sonnet-4-20250514")
            .with_base_url(server.uri()),
        reqwest::Client::new(),
    )
    .expect("construct");

    let events = collect(
        adapter
            .stream_text(ChatRequest::new(vec![ChatMessage::user("hi").build()]))
            .await
            .expect("stream"),
    )
    .await;

    assert_eq!(text_of(&events), "Hello world");
    let done = events.last().expect("done");
    match done {
        StreamEvent::Done { usage, finish_reason } => {
            assert_eq!(usage.as_ref().map(|u| u.total_tokens), Some(12));
            assert_eq!(finish_reason, &Some(FinishReason::Stop));
        }
        other => panic!("expected Done, got {other:?}"),
    }
    assert_eq!(
        events.iter().filter(|e| e.is_done()).count(),
        1,
        "exactly one Done"
    );
}

#[tokio::test]
async fn gemini_generate_text_is_derived_from_the_stream() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"The sky\"}],\"role\":\"model\"}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" is blue\"}],\"role\":\"model\"},\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"promptTokenCount\":7,\"totalTokenCount\":12}}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:streamGenerateContent"))
        .and(header("x-goog-api-key", "AIza-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let adapter = GeminiChat::new(
        GeminiConfig::new("AIza-test", "gemini-2.0-flash").with_base_url(server.uri()),
        reqwest::Client::new(),
    )
    .expect("construct");

    let response = adapter
        .generate_text(ChatRequest::new(vec![ChatMessage::user("why?").build()]))
        .await
        .expect("generate");

    assert_eq!(response.text(), "The sky is blue");
    assert_eq!(response.finish_reason, Some(FinishReason::Stop));
    let usage = response.usage.expect("usage");
    assert_eq!(usage.prompt_tokens, 7);
    // Derived from prompt/total only; never negative.
    assert_eq!(usage.completion_tokens, 5);
}

#[tokio::test]
async fn ollama_ndjson_stream_normalizes() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"model\":\"llama3.2\",\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
        "{\"model\":\"llama3.2\",\"message\":{\"role\":\"assistant\",\"content\":\" there\"},\"done\":false}\n",
        "{\"model\":\"llama3.2\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\",\"prompt_eval_count\":10,\"eval_count\":20}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let adapter = OllamaChat::new(
        OllamaConfig::new("llama3.2").with_base_url(server.uri()),
        reqwest::Client::new(),
    )
    .expect("construct");

    let events = collect(
        adapter
            .stream_text(ChatRequest::new(vec![ChatMessage::user("hi").build()]))
            .await
            .expect("stream"),
    )
    .await;

    assert_eq!(text_of(&events), "Hi there");
    match events.last().expect("done") {
        StreamEvent::Done { usage, finish_reason } => {
            let usage = usage.as_ref().expect("usage");
            assert_eq!(usage.prompt_tokens, 10);
            assert_eq!(usage.completion_tokens, 20);
            assert_eq!(finish_reason, &Some(FinishReason::Stop));
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_close_without_vendor_terminal_synthesizes_done() {
    // A Gemini stream that ends without any finish reason still terminates
    // with exactly one Done.
    let server = MockServer::start().await;
    let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"partial\"}]}}]}\n\n";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let adapter = GeminiChat::new(
        GeminiConfig::new("AIza-test", "gemini-2.0-flash").with_base_url(server.uri()),
        reqwest::Client::new(),
    )
    .expect("construct");

    let events = collect(
        adapter
            .stream_text(ChatRequest::new(vec![ChatMessage::user("hi").build()]))
            .await
            .expect("stream"),
    )
    .await;

    assert_eq!(text_of(&events), "partial");
    assert!(events.last().expect("last").is_done());
    assert_eq!(events.iter().filter(|e| e.is_done()).count(), 1);
}

#[tokio::test]
async fn streaming_error_status_surfaces_before_any_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"bad key\"}"))
        .mount(&server)
        .await;

    let adapter = AnthropicChat::new(
        AnthropicConfig::new("sk-ant-test", "claude-sonnet-4-20250514")
            .with_base_url(server.uri()),
        reqwest::Client::new(),
    )
    .expect("construct");

    let err = adapter
        .stream_text(ChatRequest::new(vec![ChatMessage::user("hi").build()]))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::ApiError { code: 401, .. }));
}
