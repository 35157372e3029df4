//! Error types shared across the crate.
//!
//! Each layer gets its own enum; the binary edge folds them into `anyhow`.

use crate::tools::ToolError;

/// Configuration resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("missing required setting {key}: {hint}")]
    Missing { key: String, hint: String },

    #[error("failed to read settings file {path}: {reason}")]
    Settings { path: String, reason: String },
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<libsql::Error> for DatabaseError {
    fn from(err: libsql::Error) -> Self {
        Self::Query(err.to_string())
    }
}

/// Errors raised while talking to the model provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Failure of a single chat run.
///
/// Only upstream failures end up here; tool input errors are fed back to the
/// model instead.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("model step failed: {0}")]
    Llm(#[from] LlmError),

    #[error("tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },
}

/// Gateway start-up and serving errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}
