//! Google Gemini provider built on rig's streaming completion API.
//!
//! One [`LlmProvider::stream_step`] call is one model request. Text deltas are
//! forwarded as they arrive; the tool calls rig aggregates over the stream are
//! emitted once it ends, followed by the step's finish reason.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use rig::OneOrMany;
use rig::client::CompletionClient;
use rig::completion::CompletionModel as _;
use rig::message::{self, AssistantContent, Message, ToolResultContent, UserContent};
use rig::providers::gemini;
use rig::streaming::StreamedAssistantContent;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::llm::{
    ChatMessage, LlmProvider, StepEvent, StepFinishReason, StepRequest, StepStream, ToolCall,
    ToolChoice, ToolDefinition,
};

const PROVIDER: &str = "gemini";

pub struct GeminiProvider {
    model: gemini::completion::CompletionModel,
    model_name: String,
}

impl GeminiProvider {
    pub fn new(api_key: &SecretString, model: &str, base_url: &str) -> Result<Self, ConfigError> {
        let client = gemini::Client::builder()
            .api_key(api_key.expose_secret())
            .base_url(base_url)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "LLM_BASE_URL".to_string(),
                message: format!("cannot build Gemini client: {e}"),
            })?;
        Ok(Self {
            model: client.completion_model(model),
            model_name: model.to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        Self::new(config.require_api_key()?, &config.model, &config.base_url)
    }
}

fn request_failed(reason: impl std::fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: PROVIDER.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn stream_step(&self, request: &StepRequest) -> Result<StepStream, LlmError> {
        let mut history = to_rig_messages(&request.messages);
        let prompt = history
            .pop()
            .ok_or_else(|| request_failed("empty conversation"))?;
        tracing::debug!(
            model = %self.model_name,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Starting Gemini step"
        );

        let mut builder = self
            .model
            .completion_request(prompt)
            .preamble(request.system_prompt.clone())
            .messages(history);
        if !request.tools.is_empty() {
            builder = builder
                .tools(request.tools.iter().map(to_rig_tool).collect())
                .tool_choice(to_rig_tool_choice(request.tool_choice));
        }

        let stream = self
            .model
            .stream(builder.build())
            .await
            .map_err(request_failed)?;

        // Text deltas while the response streams, then the aggregated tool
        // calls and the finish event.
        Ok(Box::pin(futures::stream::unfold(
            Phase::Streaming(stream),
            |phase| async move {
                let mut stream = match phase {
                    Phase::Draining(mut pending) => {
                        let event = pending.pop_front()?;
                        return Some((Ok(event), Phase::Draining(pending)));
                    }
                    Phase::Streaming(stream) => stream,
                };
                loop {
                    match stream.next().await {
                        Some(Ok(StreamedAssistantContent::Text(text))) if !text.text.is_empty() => {
                            let event = StepEvent::TextDelta(text.text);
                            return Some((Ok(event), Phase::Streaming(stream)));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            let err = request_failed(format!("stream interrupted: {e}"));
                            return Some((Err(err), Phase::Draining(VecDeque::new())));
                        }
                        None => break,
                    }
                }

                let calls: Vec<ToolCall> = stream
                    .choice
                    .iter()
                    .filter_map(|content| match content {
                        AssistantContent::ToolCall(call) => Some(from_rig_call(call)),
                        _ => None,
                    })
                    .collect();
                let mut pending = closing_events(calls);
                let event = pending.pop_front()?;
                Some((Ok(event), Phase::Draining(pending)))
            },
        )))
    }
}

enum Phase<S> {
    Streaming(S),
    Draining(VecDeque<StepEvent>),
}

fn closing_events(calls: Vec<ToolCall>) -> VecDeque<StepEvent> {
    let reason = if calls.is_empty() {
        StepFinishReason::Stop
    } else {
        StepFinishReason::ToolCalls
    };
    calls
        .into_iter()
        .map(StepEvent::ToolCall)
        .chain(std::iter::once(StepEvent::Finished(reason)))
        .collect()
}

// ==================== Conversions ====================

fn from_rig_call(call: &message::ToolCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments: call.function.arguments.clone(),
        thought_signature: call.signature.clone(),
    }
}

/// Conversation in rig's message model. Gemini keys function responses by
/// tool name, and results of one step travel together in a single user turn.
fn to_rig_messages(messages: &[ChatMessage]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    let mut results: Vec<UserContent> = Vec::new();

    for entry in messages {
        match entry {
            ChatMessage::ToolResult { name, content, .. } => {
                results.push(UserContent::tool_result(
                    name.clone(),
                    OneOrMany::one(ToolResultContent::text(content.to_string())),
                ));
            }
            ChatMessage::User { content } => {
                flush_results(&mut results, &mut out);
                out.push(Message::user(content.clone()));
            }
            ChatMessage::Assistant { text, tool_calls } => {
                flush_results(&mut results, &mut out);
                let mut parts = Vec::with_capacity(tool_calls.len() + 1);
                if !text.is_empty() {
                    parts.push(AssistantContent::text(text.clone()));
                }
                for call in tool_calls {
                    let mut part = AssistantContent::tool_call(
                        call.id.clone(),
                        call.name.clone(),
                        call.arguments.clone(),
                    );
                    if let AssistantContent::ToolCall(ref mut rig_call) = part {
                        rig_call.signature = call.thought_signature.clone();
                    }
                    parts.push(part);
                }
                if let Ok(content) = OneOrMany::many(parts) {
                    out.push(Message::Assistant { id: None, content });
                }
            }
        }
    }
    flush_results(&mut results, &mut out);
    out
}

fn flush_results(results: &mut Vec<UserContent>, out: &mut Vec<Message>) {
    if let Ok(content) = OneOrMany::many(std::mem::take(results)) {
        out.push(Message::User { content });
    }
}

fn to_rig_tool(tool: &ToolDefinition) -> rig::completion::ToolDefinition {
    rig::completion::ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: strip_unsupported_keywords(&tool.parameters),
    }
}

fn to_rig_tool_choice(choice: ToolChoice) -> message::ToolChoice {
    match choice {
        ToolChoice::Auto => message::ToolChoice::Auto,
        ToolChoice::None => message::ToolChoice::None,
        ToolChoice::Required => message::ToolChoice::Required,
    }
}

/// Gemini's schema dialect rejects `additionalProperties`.
fn strip_unsupported_keywords(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != "additionalProperties")
                .map(|(k, v)| (k.clone(), strip_unsupported_keywords(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_unsupported_keywords).collect()),
        other => other.clone(),
    }
}
