//! The chat loop.
//!
//! One run answers one user message. Each step streams a model turn; when the
//! model asks for tools they are executed and their results appended before
//! the next step. The loop stops on the first step without tool calls or when
//! the step budget is spent, whichever comes first. Text already streamed to
//! the caller is never retracted.

mod observer;

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

pub use observer::{ChatObserver, LoggingObserver};

use crate::config::{AgentConfig, MAX_STEPS_CEILING};
use crate::error::AgentError;
use crate::llm::{
    ChatMessage, LlmProvider, StepEvent, StepFinishReason, StepRequest, ToolCall, ToolChoice,
};
use crate::tools::{ToolContext, ToolRegistry};

/// Fixed instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "\
Eres un asistente corporativo.
Tu comunicación es clara, estructurada y formal.
Utilizas lenguaje técnico cuando es apropiado.
Evitas coloquialismos.
Redactas en párrafos bien organizados.
Reglas obligatorias:
- Si necesitas información de usuarios, clientes, productos, ventas o reclamos, usa las herramientas disponibles.
- Nunca inventes información.
- Si no existe información, responde que no se encontró.";

/// Capacity of the chunk channel behind a streamed response.
const STREAM_BUFFER: usize = 64;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// The model produced a step without tool calls.
    Stop,
    /// The model hit its output token limit.
    Length,
    /// The step budget ran out while the model still wanted tools.
    StepCap,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::StepCap => "step-cap",
            Self::Other(reason) => reason,
        }
    }
}

impl From<StepFinishReason> for FinishReason {
    fn from(reason: StepFinishReason) -> Self {
        match reason {
            StepFinishReason::Stop | StepFinishReason::ToolCalls => Self::Stop,
            StepFinishReason::Length => Self::Length,
            StepFinishReason::Other(other) => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepSummary {
    pub request_id: Uuid,
    pub step: usize,
    pub finish_reason: StepFinishReason,
    pub has_text: bool,
    pub tool_calls: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub request_id: Uuid,
    pub steps: usize,
    pub finish_reason: FinishReason,
    /// Everything streamed to the caller, across all steps.
    pub text: String,
    pub tool_calls: usize,
}

pub type ChunkSender = mpsc::Sender<Result<String, AgentError>>;

pub struct ChatAgent {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    max_steps: usize,
    system_prompt: String,
    observer: Arc<dyn ChatObserver>,
}

impl ChatAgent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            max_steps: config.max_steps.clamp(1, MAX_STEPS_CEILING),
            system_prompt: SYSTEM_PROMPT.to_string(),
            observer: Arc::new(LoggingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ChatObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Answer one message, sending text deltas to `chunks` as they arrive.
    ///
    /// A closed receiver does not stop the run; sends are best-effort.
    pub async fn run(
        &self,
        message: &str,
        chunks: &ChunkSender,
    ) -> Result<RunSummary, AgentError> {
        let request_id = Uuid::new_v4();
        let definitions = self.tools.definitions();
        let mut messages = vec![ChatMessage::user(message)];
        let mut text = String::new();
        let mut total_calls = 0;

        tracing::info!(
            %request_id,
            model = self.llm.model_name(),
            max_steps = self.max_steps,
            "Chat run started"
        );

        for step in 1..=self.max_steps {
            let request = StepRequest {
                system_prompt: self.system_prompt.clone(),
                messages: messages.clone(),
                tools: definitions.clone(),
                tool_choice: ToolChoice::Auto,
            };
            let mut stream = self.llm.stream_step(&request).await?;

            let mut step_text = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            let mut step_reason = StepFinishReason::Stop;
            while let Some(event) = stream.next().await {
                match event? {
                    StepEvent::TextDelta(delta) => {
                        step_text.push_str(&delta);
                        let _ = chunks.send(Ok(delta)).await;
                    }
                    StepEvent::ToolCall(call) => calls.push(call),
                    StepEvent::Finished(reason) => step_reason = reason,
                }
            }
            text.push_str(&step_text);

            self.observer.on_step_finish(&StepSummary {
                request_id,
                step,
                finish_reason: step_reason.clone(),
                has_text: !step_text.trim().is_empty(),
                tool_calls: calls.len(),
            });

            if calls.is_empty() {
                return Ok(self.finish(request_id, step, step_reason.into(), text, total_calls));
            }

            total_calls += calls.len();
            messages.push(ChatMessage::Assistant {
                text: step_text,
                tool_calls: calls.clone(),
            });
            let ctx = ToolContext::new(request_id, step);
            for call in calls {
                let content = self.execute_tool(&call, &ctx).await?;
                messages.push(ChatMessage::ToolResult {
                    call_id: call.id,
                    name: call.name,
                    content,
                });
            }
        }

        Ok(self.finish(
            request_id,
            self.max_steps,
            FinishReason::StepCap,
            text,
            total_calls,
        ))
    }

    /// Run in a background task and expose the chunks as a stream.
    ///
    /// The task outlives the returned stream; a failed run ends the stream
    /// with one `Err` item.
    pub fn spawn_stream(
        self: &Arc<Self>,
        message: String,
    ) -> ReceiverStream<Result<String, AgentError>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = agent.run(&message, &tx).await {
                tracing::error!(error = %e, "Chat run failed");
                let _ = tx.send(Err(e)).await;
            }
        });
        ReceiverStream::new(rx)
    }

    /// Execute one requested tool and produce the content fed back to the
    /// model. Bad arguments and unknown names become `{"error": ...}`; store
    /// failures abort the run.
    async fn execute_tool(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, AgentError> {
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(
                request_id = %ctx.request_id,
                tool = %call.name,
                "Model requested unknown tool"
            );
            return Ok(serde_json::json!({ "error": format!("Unknown tool '{}'", call.name) }));
        };

        let start = Instant::now();
        match tool.execute(call.arguments.clone(), ctx).await {
            Ok(output) => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    step = ctx.step,
                    tool = %call.name,
                    elapsed_ms = output.duration.as_millis() as u64,
                    "Tool executed"
                );
                Ok(output.result)
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    tool = %call.name,
                    error = %e,
                    "Tool rejected arguments"
                );
                Ok(serde_json::json!({ "error": e.to_string() }))
            }
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    tool = %call.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Tool failed"
                );
                Err(AgentError::Tool {
                    name: call.name.clone(),
                    source: e,
                })
            }
        }
    }

    fn finish(
        &self,
        request_id: Uuid,
        steps: usize,
        finish_reason: FinishReason,
        text: String,
        tool_calls: usize,
    ) -> RunSummary {
        let summary = RunSummary {
            request_id,
            steps,
            finish_reason,
            text,
            tool_calls,
        };
        self.observer.on_finish(&summary);
        summary
    }
}
