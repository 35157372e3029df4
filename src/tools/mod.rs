//! Tools the model can call.

pub mod builtin;
mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolContext, ToolError, ToolOutput};
