use crate::agent::{RunSummary, StepSummary};

/// Hooks fired as a chat run progresses.
pub trait ChatObserver: Send + Sync {
    fn on_step_finish(&self, step: &StepSummary) {
        tracing::info!(
            target: "chat.step",
            request_id = %step.request_id,
            step = step.step,
            finish_reason = step.finish_reason.as_str(),
            has_text = step.has_text,
            tool_calls = step.tool_calls,
            "Step finished"
        );
    }

    fn on_finish(&self, summary: &RunSummary) {
        tracing::info!(
            target: "chat.finish",
            request_id = %summary.request_id,
            finish_reason = summary.finish_reason.as_str(),
            steps = summary.steps,
            tool_calls = summary.tool_calls,
            text_length = summary.text.len(),
            "Chat finished"
        );
    }
}

/// Observer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ChatObserver for LoggingObserver {}
