//! End-to-end tests for the chat gateway.
//!
//! Each test starts a real Axum server on a random port, backed by a seeded
//! temp-file database and a rule-driven fake model, and talks to it over
//! HTTP:
//! - tool call, result fed back, final text streamed
//! - not-found lookup answered as "no se encontró"
//! - step cap with already-streamed text preserved
//! - upstream failure after the first chunk aborts the body
//! - request validation

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::timeout;

use concierge::agent::ChatAgent;
use concierge::channels::web::{GatewayState, start_server};
use concierge::config::{AgentConfig, DatabaseConfig};
use concierge::db::{Database, connect_from_config};
use concierge::error::LlmError;
use concierge::llm::{
    ChatMessage, LlmProvider, StepEvent, StepFinishReason, StepRequest, StepStream, ToolCall,
};
use concierge::seed::seed_demo_data;
use concierge::tools::ToolRegistry;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Plays the model's part from the last message in the request.
#[derive(Default)]
struct RuleProvider {
    steps: AtomicUsize,
}

fn tool_call(name: &str, arguments: serde_json::Value) -> StepEvent {
    StepEvent::ToolCall(ToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments,
        thought_signature: None,
    })
}

fn text(delta: &str) -> StepEvent {
    StepEvent::TextDelta(delta.to_string())
}

impl RuleProvider {
    fn respond(request: &StepRequest) -> Vec<StepEvent> {
        match request.messages.last() {
            Some(ChatMessage::User { content }) if content.contains("productos") => {
                vec![tool_call("list_products", serde_json::json!({}))]
            }
            Some(ChatMessage::User { content }) if content.contains("Pérez") => vec![tool_call(
                "get_user_by_full_name",
                serde_json::json!({"nombre": "Juan", "apellido": "Pérez"}),
            )],
            Some(ChatMessage::User { content }) if content.contains("bucle") => {
                vec![text("Consultando. "), tool_call("list_users", serde_json::json!({}))]
            }
            Some(ChatMessage::ToolResult { name, content, .. }) => match name.as_str() {
                "list_products" => {
                    let names: Vec<&str> = content
                        .as_array()
                        .map(|items| items.iter().filter_map(|p| p["name"].as_str()).collect())
                        .unwrap_or_default();
                    vec![text("Productos disponibles: "), text(&names.join(", "))]
                }
                "get_user_by_full_name" if content.is_null() => {
                    vec![text("No se encontró información del usuario solicitado.")]
                }
                "list_users" => vec![tool_call("list_users", serde_json::json!({}))],
                other => vec![text(&format!("Resultado de {other}."))],
            },
            _ => vec![text("Sin acción.")],
        }
    }
}

#[async_trait]
impl LlmProvider for RuleProvider {
    fn name(&self) -> &str {
        "rules"
    }

    fn model_name(&self) -> &str {
        "rules-1"
    }

    async fn stream_step(&self, request: &StepRequest) -> Result<StepStream, LlmError> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        let fails = matches!(
            request.messages.last(),
            Some(ChatMessage::User { content }) if content.contains("falla")
        );
        if fails {
            let items = vec![
                Ok(text("Buscando ventas... ")),
                Err(LlmError::RequestFailed {
                    provider: "rules".to_string(),
                    reason: "connection reset".to_string(),
                }),
            ];
            return Ok(Box::pin(futures::stream::iter(items)));
        }
        let mut events = Self::respond(request);
        let has_calls = events.iter().any(|e| matches!(e, StepEvent::ToolCall(_)));
        events.push(StepEvent::Finished(if has_calls {
            StepFinishReason::ToolCalls
        } else {
            StepFinishReason::Stop
        }));
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}

struct TestServer {
    addr: SocketAddr,
    state: Arc<GatewayState>,
    provider: Arc<RuleProvider>,
    _tmpdir: tempfile::TempDir,
}

async fn start_test_server() -> TestServer {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let config = DatabaseConfig::local(tmpdir.path().join("gateway_test.db"));
    let db: Arc<dyn Database> = connect_from_config(&config).await.expect("database");
    seed_demo_data(db.as_ref()).await.expect("seed");

    let provider = Arc::new(RuleProvider::default());
    let agent = ChatAgent::new(
        Arc::clone(&provider) as Arc<dyn LlmProvider>,
        Arc::new(ToolRegistry::with_builtins(db)),
        &AgentConfig::default(),
    );
    let state = Arc::new(GatewayState::new(Arc::new(agent)));
    let addr = start_server("127.0.0.1:0".parse().unwrap(), Arc::clone(&state))
        .await
        .expect("server should start");

    TestServer {
        addr,
        state,
        provider,
        _tmpdir: tmpdir,
    }
}

/// POST a message and read the streamed body chunk by chunk.
async fn chat(addr: SocketAddr, message: &str) -> (reqwest::StatusCode, String) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({ "message": message, "requestId": "t1" }))
        .send()
        .await
        .expect("request");
    let status = response.status();

    let mut bytes = Vec::new();
    let mut body = Box::pin(response.bytes_stream());
    while let Some(chunk) = timeout(TIMEOUT, body.next()).await.expect("chunk in time") {
        bytes.extend_from_slice(&chunk.expect("chunk"));
    }
    (status, String::from_utf8(bytes).expect("utf-8 body"))
}

#[tokio::test]
async fn test_product_list_is_streamed_from_tool_result() {
    let server = start_test_server().await;

    let (status, body) = chat(server.addr, "lista de productos").await;
    assert_eq!(status, reqwest::StatusCode::OK);

    assert!(body.starts_with("Productos disponibles: "), "{body}");
    for name in ["Teclado mecánico", "Mouse inalámbrico", "Base para laptop"] {
        assert!(body.contains(name), "missing {name} in {body}");
    }
    assert_eq!(server.provider.steps.load(Ordering::SeqCst), 2);

    server.state.shutdown().await;
}

#[tokio::test]
async fn test_unknown_user_answers_not_found() {
    let server = start_test_server().await;

    let (status, body) = chat(server.addr, "busca al usuario Juan Pérez").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(
        body,
        "No se encontró información del usuario solicitado."
    );

    server.state.shutdown().await;
}

#[tokio::test]
async fn test_step_cap_keeps_streamed_text() {
    let server = start_test_server().await;

    let (status, body) = chat(server.addr, "entra en bucle").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, "Consultando. ");
    assert_eq!(server.provider.steps.load(Ordering::SeqCst), 5);

    server.state.shutdown().await;
}

#[tokio::test]
async fn test_model_failure_mid_stream_aborts_body() {
    let server = start_test_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/chat", server.addr))
        .json(&serde_json::json!({ "message": "esto falla" }))
        .send()
        .await
        .expect("request");
    // Headers were already sent when the model failed.
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let mut received = Vec::new();
    let mut failed = false;
    let mut body = Box::pin(response.bytes_stream());
    while let Some(chunk) = timeout(TIMEOUT, body.next()).await.expect("chunk in time") {
        match chunk {
            Ok(bytes) => received.extend_from_slice(&bytes),
            Err(_) => {
                failed = true;
                break;
            }
        }
    }

    assert!(failed, "body should end with a transport error");
    // Nothing after the failure point reaches the client.
    let received = String::from_utf8_lossy(&received);
    assert!("Buscando ventas... ".starts_with(received.as_ref()), "{received}");
    assert_eq!(server.provider.steps.load(Ordering::SeqCst), 1);

    server.state.shutdown().await;
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let server = start_test_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/chat", server.addr))
        .json(&serde_json::json!({ "message": "  \n " }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(server.provider.steps.load(Ordering::SeqCst), 0);

    server.state.shutdown().await;
}

#[tokio::test]
async fn test_health_and_tool_catalog() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("http://{}/api/health", server.addr))
        .send()
        .await
        .expect("health")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "healthy");

    let catalog: serde_json::Value = client
        .get(format!("http://{}/api/tools", server.addr))
        .send()
        .await
        .expect("tools")
        .json()
        .await
        .expect("tools json");
    let names: Vec<&str> = catalog["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names.len(), 9);
    assert!(names.contains(&"get_user_by_full_name"));
    assert_eq!(catalog["model"], "rules-1");

    server.state.shutdown().await;
}
