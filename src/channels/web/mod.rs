//! Web gateway: a streaming chat endpoint plus the embedded browser UI.
//!
//! ```text
//! POST /api/chat    {"message": "..."} -> text/plain stream
//! GET  /api/health  liveness and uptime
//! GET  /api/tools   tool catalog sent to the model
//! GET  /            chat page (index.html, app.js, style.css)
//! ```

pub mod server;
pub mod types;

pub use server::{GatewayState, router, start_server};
