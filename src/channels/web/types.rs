//! Request and response DTOs for the web gateway API.

use serde::{Deserialize, Serialize};

// --- Chat ---

/// Body of `POST /api/chat`. Unknown fields (the browser sends a
/// `requestId`) are ignored.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// --- Tools ---

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub model: String,
    pub max_steps: usize,
    pub tools: Vec<ToolInfo>,
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}
