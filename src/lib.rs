//! Concierge: a corporate chat assistant.
//!
//! A user message goes to [`agent::ChatAgent`], which drives a tool-calling
//! model ([`llm`]) over the company database ([`db`]) through the adapters in
//! [`tools`]. Answers stream back through the HTTP gateway
//! ([`channels::web`]) or the terminal client ([`client`]).

pub mod agent;
pub mod channels;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod seed;
pub mod settings;
pub mod tools;
