use axum::{extract::State, http::StatusCode, Json};
use caio_agent::LlmClient;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub model: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let model = model_check(state.runtime().llm()).await;
    let ready = model.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("caio-server serving {} tools", state.runtime().tools().len()),
        },
        model,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

pub async fn model_check(client: &dyn LlmClient) -> HealthCheck {
    match client.health_check().await {
        Ok(()) => HealthCheck { status: "ready", detail: format!("{} backend reachable", client.name()) },
        Err(error) => {
            warn!(
                event_name = "system.health.model_unreachable",
                correlation_id = "health",
                backend = client.name(),
                error = %error,
                "model backend health check failed"
            );
            HealthCheck {
                status: "degraded",
                detail: format!("{} backend unreachable: {error}", client.name()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{extract::State, http::StatusCode, Json};
    use caio_agent::llm::{Completion, CompletionRequest, LlmClient, LlmError};
    use caio_agent::providers::ScriptedClient;
    use caio_agent::tools::ToolRegistry;
    use caio_agent::{AgentRuntime, SystemPolicy};
    use caio_core::config::{PolicyConfig, DEFAULT_FALLBACK_REPLY};

    use crate::health::health;
    use crate::routes::AppState;

    struct UnreachableBackend;

    #[async_trait]
    impl LlmClient for UnreachableBackend {
        fn name(&self) -> &'static str {
            "ollama"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
            Err(LlmError::NotConfigured("offline".to_string()))
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Err(LlmError::Api { status: 502, body: "bad gateway".to_string() })
        }
    }

    fn state(client: Arc<dyn LlmClient>) -> AppState {
        let policy = SystemPolicy::render(&PolicyConfig::default(), &[], None).expect("policy");
        AppState::new(
            Arc::new(AgentRuntime::new(client, ToolRegistry::default(), policy)),
            DEFAULT_FALLBACK_REPLY,
        )
    }

    #[tokio::test]
    async fn health_returns_ready_when_model_is_reachable() {
        let (status, Json(payload)) = health(State(state(Arc::new(ScriptedClient::default())))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.model.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert!(!payload.checked_at.is_empty());
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_model_is_unreachable() {
        let (status, Json(payload)) = health(State(state(Arc::new(UnreachableBackend)))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.model.status, "degraded");
        assert!(payload.model.detail.contains("502"));
        assert_eq!(payload.service.status, "ready");
    }
}
