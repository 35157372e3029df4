//! Axum HTTP server for the web gateway.
//!
//! Serves the chat endpoint, the health and tool catalog endpoints, and the
//! embedded browser UI.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::oneshot;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::agent::ChatAgent;
use crate::channels::web::types::*;
use crate::error::ChannelError;

/// Chat messages are short; anything larger is rejected before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self'; style-src 'self'; img-src 'self' data:; connect-src 'self'; object-src 'none'; frame-ancestors 'none'; base-uri 'self'; form-action 'self'";

/// Shared state for all gateway handlers.
pub struct GatewayState {
    /// Agent that answers chat requests.
    pub agent: Arc<ChatAgent>,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
    /// Server startup time for uptime calculation.
    pub startup_time: Instant,
}

impl GatewayState {
    pub fn new(agent: Arc<ChatAgent>) -> Self {
        Self {
            agent,
            shutdown_tx: tokio::sync::RwLock::new(None),
            startup_time: Instant::now(),
        }
    }

    /// Signal the server to stop accepting connections. Returns `false` when
    /// the server was never started or is already stopping.
    pub async fn shutdown(&self) -> bool {
        match self.shutdown_tx.write().await.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Build the gateway router. `addr` is the bound address, used for the CORS
/// allow-list.
pub fn router(state: Arc<GatewayState>, addr: SocketAddr) -> Router {
    let api = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .route("/api/tools", get(tools_handler));

    // Static file routes, served from embedded strings
    let statics = Router::new()
        .route("/", get(index_handler))
        .route("/style.css", get(css_handler))
        .route("/app.js", get(js_handler));

    // Only the gateway's own origins may call the API from a browser.
    let origins: Vec<HeaderValue> = [
        format!("http://{}:{}", addr.ip(), addr.port()),
        format!("http://localhost:{}", addr.port()),
    ]
    .iter()
    .filter_map(|origin| HeaderValue::from_str(origin).ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE]));

    Router::new()
        .merge(api)
        .merge(statics)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
) -> Result<SocketAddr, ChannelError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = router(Arc::clone(&state), bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Web gateway shutting down");
            })
            .await
        {
            tracing::error!("Web gateway server error: {}", e);
        }
    });

    tracing::info!(addr = %bound_addr, "Web gateway listening");
    Ok(bound_addr)
}

// --- Static file handlers ---

async fn index_handler() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        include_str!("static/index.html"),
    )
}

async fn css_handler() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/css"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        include_str!("static/style.css"),
    )
}

async fn js_handler() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        include_str!("static/app.js"),
    )
}

// --- Health ---

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        uptime_secs: state.startup_time.elapsed().as_secs(),
    })
}

// --- Tools ---

async fn tools_handler(State(state): State<Arc<GatewayState>>) -> Json<ToolListResponse> {
    let tools = state
        .agent
        .tools()
        .definitions()
        .into_iter()
        .map(|td| ToolInfo {
            name: td.name,
            description: td.description,
            parameters: td.parameters,
        })
        .collect();

    Json(ToolListResponse {
        model: state.agent.model_name().to_string(),
        max_steps: state.agent.max_steps(),
        tools,
    })
}

// --- Chat ---

/// Stream the answer to one message as plain UTF-8 text.
///
/// Chunks are forwarded as the model produces them. A run that fails after
/// streaming has begun aborts the body, which the client sees as a broken
/// transfer.
async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected chat request body");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;

    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("message must not be empty")),
        ));
    }

    let chunks = state.agent.spawn_stream(req.message);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AgentConfig;
    use crate::error::LlmError;
    use crate::llm::{LlmProvider, StepEvent, StepFinishReason, StepRequest, StepStream};
    use crate::tools::ToolRegistry;

    /// Answers every step with the same text.
    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn model_name(&self) -> &str {
            "echo-1"
        }

        async fn stream_step(&self, request: &StepRequest) -> Result<StepStream, LlmError> {
            let events = vec![
                Ok(StepEvent::TextDelta("Hola, ".to_string())),
                Ok(StepEvent::TextDelta(format!(
                    "{} mensaje(s).",
                    request.messages.len()
                ))),
                Ok(StepEvent::Finished(StepFinishReason::Stop)),
            ];
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    fn test_router() -> Router {
        let agent = ChatAgent::new(
            Arc::new(EchoProvider),
            Arc::new(ToolRegistry::new()),
            &AgentConfig::default(),
        );
        let state = Arc::new(GatewayState::new(Arc::new(agent)));
        router(state, SocketAddr::from(([127, 0, 0, 1], 3000)))
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_no_inline_event_handlers(asset_name: &str, content: &str) {
        let patterns = ["onclick=", "onchange=", "oninput=", "onkeydown="];
        for pattern in patterns {
            assert!(
                !content.contains(pattern),
                "{} unexpectedly contains inline event handler pattern '{}'",
                asset_name,
                pattern
            );
        }
    }

    #[tokio::test]
    async fn test_chat_streams_plain_text() {
        let response = test_router()
            .oneshot(chat_request(r#"{"message":"hola","requestId":"x1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "Hola, 1 mensaje(s).");
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let response = test_router()
            .oneshot(chat_request(r#"{"message":"   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "message must not be empty");
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let response = test_router()
            .oneshot(chat_request("not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_healthy() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_tools_lists_model_and_budget() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/tools")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["model"], "echo-1");
        assert_eq!(body["max_steps"], 5);
        assert_eq!(body["tools"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_index_sets_security_headers() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_shutdown_without_server_is_noop() {
        let agent = ChatAgent::new(
            Arc::new(EchoProvider),
            Arc::new(ToolRegistry::new()),
            &AgentConfig::default(),
        );
        let state = GatewayState::new(Arc::new(agent));
        assert!(!state.shutdown().await);
    }

    #[test]
    fn test_index_html_has_no_inline_event_handlers() {
        let index = include_str!("static/index.html");
        assert_no_inline_event_handlers("index.html", index);
    }

    #[test]
    fn test_app_js_has_no_inline_event_handlers() {
        let app_js = include_str!("static/app.js");
        assert_no_inline_event_handlers("app.js", app_js);
    }

    #[test]
    fn test_app_js_posts_to_chat_endpoint() {
        let app_js = include_str!("static/app.js");
        assert!(app_js.contains("'/api/chat'"));
        assert!(app_js.contains("Error al procesar la respuesta."));
        assert!(!app_js.contains("innerHTML = text"));
    }
}
