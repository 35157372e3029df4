//! Language model abstraction.
//!
//! A provider performs one *step*: given the system instruction, the message
//! list and the tool catalog it streams back text deltas and tool calls. The
//! step loop itself lives in [`crate::agent`].

pub mod gemini;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

pub use gemini::GeminiProvider;

use crate::error::LlmError;

/// A tool as declared to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    /// Opaque provider token that must be echoed back with the call.
    pub thought_signature: Option<String>,
}

/// One entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    User {
        content: String,
    },
    Assistant {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: serde_json::Value,
    },
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    #[default]
    Auto,
    None,
    Required,
}

#[derive(Debug, Clone)]
pub struct StepRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

/// Why the provider ended a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl StepFinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool-calls",
            Self::Length => "length",
            Self::Other(reason) => reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    TextDelta(String),
    ToolCall(ToolCall),
    Finished(StepFinishReason),
}

pub type StepStream = Pin<Box<dyn Stream<Item = Result<StepEvent, LlmError>> + Send>>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider id used in logs and errors.
    fn name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Start one model step. Errors before the first byte come back here;
    /// later failures arrive as `Err` items on the stream.
    async fn stream_step(&self, request: &StepRequest) -> Result<StepStream, LlmError>;
}
