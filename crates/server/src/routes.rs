use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use caio_agent::AgentRuntime;
use tower_http::cors::CorsLayer;

use crate::{chat, health};

/// Shared by every request: the agent runtime and the reply used when it fails.
#[derive(Clone)]
pub struct AppState {
    runtime: Arc<AgentRuntime>,
    fallback_reply: Arc<str>,
}

impl AppState {
    pub fn new(runtime: Arc<AgentRuntime>, fallback_reply: impl Into<Arc<str>>) -> Self {
        Self { runtime, fallback_reply: fallback_reply.into() }
    }

    pub fn runtime(&self) -> &AgentRuntime {
        self.runtime.as_ref()
    }

    /// Owned handle for work that must outlive the borrow of the state.
    pub fn shared_runtime(&self) -> Arc<AgentRuntime> {
        Arc::clone(&self.runtime)
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use async_trait::async_trait;
    use caio_agent::llm::{Completion, ToolInvocation, ToolSpec};
    use caio_agent::providers::{ScriptedClient, ScriptedStep};
    use caio_agent::tools::{standard_registry, Tool, ToolError};
    use caio_agent::{AgentRuntime, SystemPolicy};
    use caio_core::config::{PolicyConfig, DEFAULT_FALLBACK_REPLY};
    use caio_core::fixtures;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, AppState};

    fn state(client: ScriptedClient) -> AppState {
        let tools = standard_registry(
            Arc::new(fixtures::permission_directory()),
            Arc::new(fixtures::payment_ledger()),
            Arc::new(fixtures::material_catalog()),
        );
        let policy =
            SystemPolicy::render(&PolicyConfig::default(), &tools.specs(), None).expect("policy");
        AppState::new(
            Arc::new(AgentRuntime::new(Arc::new(client), tools, policy)),
            DEFAULT_FALLBACK_REPLY,
        )
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &'static str {
            "quebrar"
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "quebrar".to_string(), description: String::new(), parameters: json!({}) }
        }

        async fn execute(&self, _arguments: &Value) -> Result<String, ToolError> {
            let empty: Vec<String> = Vec::new();
            Ok(empty[0].clone())
        }
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn chat_route_returns_reply_and_outcome_header() {
        let app = router(state(ScriptedClient::answering("Olá, sou o Caio.")));

        let response = app
            .oneshot(chat_request(r#"{"message":"oi","user_email":"joao.silva@empresa.com"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-caio-outcome"], "answered");
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload, serde_json::json!({"reply": "Olá, sou o Caio."}));
    }

    #[tokio::test]
    async fn failing_model_still_returns_200_with_fallback() {
        let app = router(state(ScriptedClient::new([ScriptedStep::Fail("refused".to_string())])));

        let response = app
            .oneshot(chat_request(r#"{"message":"oi","user_email":"joao.silva@empresa.com"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-caio-outcome"], "degraded");
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["reply"], DEFAULT_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn panicking_tool_still_returns_200_with_fallback() {
        let mut tools = standard_registry(
            Arc::new(fixtures::permission_directory()),
            Arc::new(fixtures::payment_ledger()),
            Arc::new(fixtures::material_catalog()),
        );
        let policy =
            SystemPolicy::render(&PolicyConfig::default(), &tools.specs(), None).expect("policy");
        tools.register(PanickingTool);
        let client = ScriptedClient::new([ScriptedStep::Complete(Completion::Invoke(vec![
            ToolInvocation::new("quebrar", json!({})),
        ]))]);
        let state = AppState::new(
            Arc::new(AgentRuntime::new(Arc::new(client), tools, policy)),
            DEFAULT_FALLBACK_REPLY,
        );

        let response = router(state)
            .oneshot(chat_request(r#"{"message":"oi","user_email":"joao.silva@empresa.com"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-caio-outcome"], "degraded");
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["reply"], DEFAULT_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn body_missing_fields_is_rejected_by_the_extractor() {
        let app = router(state(ScriptedClient::default()));

        let response = app.oneshot(chat_request(r#"{"message":"oi"}"#)).await.expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = router(state(ScriptedClient::default()));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn health_route_is_mounted() {
        let app = router(state(ScriptedClient::default()));
        let request =
            Request::builder().uri("/health").body(Body::empty()).expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
