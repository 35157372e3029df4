//! Tool trait and the types passed across it.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Failure of a single tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments did not match the declared schema. The handler never ran.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ToolError {
    /// Errors the model can react to, as opposed to ones that end the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidParameters(_))
    }
}

/// Result of a successful tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub result: serde_json::Value,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Serialize a handler result. `None` becomes JSON `null`.
    pub fn from_serializable<T: serde::Serialize>(
        value: &T,
        duration: Duration,
    ) -> Result<Self, ToolError> {
        let result = serde_json::to_value(value)
            .map_err(|e| ToolError::ExecutionFailed(format!("result serialization: {e}")))?;
        Ok(Self::success(result, duration))
    }
}

/// Per-invocation context.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub request_id: Uuid,
    pub step: usize,
}

impl ToolContext {
    pub fn new(request_id: Uuid, step: usize) -> Self {
        Self { request_id, step }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(Uuid::new_v4(), 1)
    }
}

/// An operation the model may invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError>;
}

/// Deserialize tool arguments, mapping any mismatch to `InvalidParameters`.
pub fn parse_params<T: DeserializeOwned>(
    tool: &str,
    params: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(params)
        .map_err(|e| ToolError::InvalidParameters(format!("{tool}: {e}")))
}
