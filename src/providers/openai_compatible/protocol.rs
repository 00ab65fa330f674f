//! Request/response translation for the OpenAI chat-completions wire
//! format.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::argument::ToolArgument;
use crate::error::ClientError;
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, FinishReason, MediaSource,
    MessageContent, MessageRole, Tool, Usage,
};

/// Map an OpenAI-style finish reason string into the closed set.
/// Unrecognized values become `Other` and never fail the call.
pub fn map_finish_reason(raw: &str) -> FinishReason {
    match raw {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Build a chat-completions request body.
pub fn build_chat_body(
    model: &str,
    request: &ChatRequest,
    stream: bool,
) -> Result<Value, ClientError> {
    let mut body = json!({
        "model": model,
        "messages": build_messages(&request.messages)?,
        "stream": stream,
    });

    if let Some(temperature) = request.params.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.params.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = request.params.top_p {
        body["top_p"] = json!(top_p);
    }
    if request.params.top_k.is_some() {
        // Not part of this protocol; the vendor applies its own default.
        tracing::debug!(target: "llmux::openai", "dropping top_k: unsupported by chat-completions");
    }

    if let Some(tools) = &request.tools {
        body["tools"] = Value::Array(tools.iter().map(build_tool).collect());
    }

    Ok(body)
}

fn build_tool(tool: &Tool) -> Value {
    let function = tool.as_function();
    json!({
        "type": "function",
        "function": {
            "name": function.name,
            "description": function.description,
            "parameters": function.parameters,
        }
    })
}

fn build_messages(messages: &[ChatMessage]) -> Result<Vec<Value>, ClientError> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            MessageRole::System => out.push(json!({
                "role": "system",
                "content": message.content.all_text(),
            })),
            MessageRole::User => out.push(build_user_message(&message.content)?),
            MessageRole::Assistant => out.push(build_assistant_message(&message.content)),
            MessageRole::Tool => {
                // One wire message per tool result part.
                for part in message.content.parts() {
                    if let ContentPart::ToolResult { call_id, output } = part {
                        out.push(json!({
                            "role": "tool",
                            "tool_call_id": call_id,
                            "content": tool_output_text(&output),
                        }));
                    }
                }
            }
        }
    }
    Ok(out)
}

fn tool_output_text(output: &ToolArgument) -> String {
    match output {
        ToolArgument::Text(text) => text.clone(),
        other => serde_json::to_string(&other.clone().into_json()).unwrap_or_default(),
    }
}

fn build_user_message(content: &MessageContent) -> Result<Value, ClientError> {
    match content {
        MessageContent::Text(text) => Ok(json!({ "role": "user", "content": text })),
        MessageContent::Parts(parts) => {
            let mut wire_parts = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    ContentPart::Text { text } => {
                        wire_parts.push(json!({ "type": "text", "text": text }));
                    }
                    ContentPart::Image { source, media_type } => {
                        wire_parts.push(json!({
                            "type": "image_url",
                            "image_url": { "url": image_url(source, media_type) }
                        }));
                    }
                    ContentPart::ToolCall { .. } | ContentPart::ToolResult { .. } => {
                        return Err(ClientError::InvalidInput(
                            "tool parts are not valid in a user message".to_string(),
                        ));
                    }
                }
            }
            Ok(json!({ "role": "user", "content": wire_parts }))
        }
    }
}

/// Images travel as URLs, or inline as base64 data URLs with their media
/// type, per this protocol's convention.
fn image_url(source: &MediaSource, media_type: &str) -> String {
    match source.as_url() {
        Some(url) => url.to_string(),
        None => format!(
            "data:{};base64,{}",
            media_type,
            source.as_base64().unwrap_or_default()
        ),
    }
}

fn build_assistant_message(content: &MessageContent) -> Value {
    let text = content.all_text();
    let tool_calls: Vec<Value> = content
        .parts()
        .iter()
        .filter_map(|part| match part {
            ContentPart::ToolCall { id, name, arguments } => Some(json!({
                "id": id,
                "type": "function",
                "function": {
                    "name": name,
                    "arguments": serde_json::to_string(&arguments.clone().into_json())
                        .unwrap_or_default(),
                }
            })),
            _ => None,
        })
        .collect();

    let mut message = json!({ "role": "assistant" });
    message["content"] = if text.is_empty() { Value::Null } else { json!(text) };
    if !tool_calls.is_empty() {
        message["tool_calls"] = Value::Array(tool_calls);
    }
    message
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl WireUsage {
    pub(crate) fn into_usage(self) -> Usage {
        let prompt = self.prompt_tokens.unwrap_or(0);
        match self.completion_tokens {
            Some(completion) => Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: self.total_tokens.unwrap_or(prompt + completion),
            },
            None => Usage::from_prompt_and_total(prompt, self.total_tokens.unwrap_or(prompt)),
        }
    }
}

/// Parse a buffered chat-completions response body.
pub fn parse_chat_response(provider: &str, body: &str) -> Result<ChatResponse, ClientError> {
    let wire: WireChatResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::ParseError(format!("malformed {provider} response: {e}")))?;

    let mut response = ChatResponse::empty(provider);
    response.id = wire.id;
    response.model = wire.model;
    response.usage = wire.usage.map(WireUsage::into_usage);

    let Some(choice) = wire.choices.into_iter().next() else {
        return Err(ClientError::ParseError(format!(
            "{provider} response carried no choices"
        )));
    };
    response.finish_reason = choice.finish_reason.as_deref().map(map_finish_reason);

    let mut parts = Vec::new();
    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        parts.push(ContentPart::text(text));
    }
    for call in choice.message.tool_calls.unwrap_or_default() {
        parts.push(ContentPart::tool_call(
            call.id,
            call.function.name,
            ToolArgument::parse_str(&call.function.arguments),
        ));
    }
    response.content = match parts.as_slice() {
        [ContentPart::Text { text }] => MessageContent::Text(text.clone()),
        _ => MessageContent::Parts(parts),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[test]
    fn body_carries_roles_params_and_tools() {
        let request = ChatRequest::builder()
            .message(ChatMessage::system("be terse").build())
            .message(ChatMessage::user("hi").build())
            .temperature(0.5)
            .max_tokens(64)
            .tools(vec![Tool::function("echo", "Echo input", json!({"type": "object"}))])
            .build();
        let body = build_chat_body("gpt-4o-mini", &request, false).expect("body");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["temperature"], json!(0.5));
        assert_eq!(body["max_tokens"], json!(64));
        assert_eq!(body["tools"][0]["function"]["name"], "echo");
        assert_eq!(body["stream"], json!(false));
    }

    #[test]
    fn inline_images_become_data_urls() {
        let request = ChatRequest::new(vec![ChatMessage::user("see")
            .with_image(MediaSource::base64("QUJD"), "image/png")
            .build()]);
        let body = build_chat_body("gpt-4o", &request, false).expect("body");
        let url = body["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .expect("url");
        assert_eq!(url, "data:image/png;base64,QUJD");
    }

    #[test]
    fn response_parse_extracts_tool_calls_and_usage() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "echo", "arguments": "{\"text\":\"hi\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 9, "total_tokens": 12}
        }"#;
        let response = parse_chat_response("openai", body).expect("parse");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.tool_calls().len(), 1);
        let usage = response.usage.expect("usage");
        assert_eq!(usage.completion_tokens, 3);
    }

    #[test]
    fn unknown_finish_reason_maps_to_other() {
        assert_eq!(
            map_finish_reason("flagged_by_moderation"),
            FinishReason::Other("flagged_by_moderation".into())
        );
    }
}
