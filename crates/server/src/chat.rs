use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Json;
use caio_core::ApplicationError;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::routes::AppState;

pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-caio-outcome");

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Whether the reply came from the agent or is the fixed fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    Answered,
    Degraded { reason_code: &'static str },
}

impl ChatOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Degraded { .. } => "degraded",
        }
    }

    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Answered => None,
            Self::Degraded { reason_code } => Some(*reason_code),
        }
    }
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, [(HeaderName, HeaderValue); 1], Json<ChatReply>) {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("chat_request", correlation_id = %correlation_id);

    let (outcome, reply) = respond(&state, &request, &correlation_id).instrument(span).await;
    info!(
        event_name = "chat.request.completed",
        correlation_id = %correlation_id,
        outcome = outcome.as_str(),
        reason_code = outcome.reason_code().unwrap_or("none"),
        "chat response sent"
    );
    (StatusCode::OK, [(OUTCOME_HEADER, HeaderValue::from_static(outcome.as_str()))], Json(reply))
}

/// Runs the agent and folds every failure into the fallback reply.
pub async fn respond(
    state: &AppState,
    request: &ChatRequest,
    correlation_id: &str,
) -> (ChatOutcome, ChatReply) {
    info!(
        event_name = "chat.request.received",
        correlation_id,
        user_email = %request.user_email,
        message_chars = request.message.chars().count(),
        "chat request received"
    );

    // A panicking tool or backend comes back as a JoinError.
    let runtime = state.shared_runtime();
    let (user_email, message) = (request.user_email.clone(), request.message.clone());
    let invocation = tokio::spawn(
        async move { runtime.handle_message(&user_email, &message).await }.in_current_span(),
    );

    let failure = match invocation.await {
        Ok(Ok(reply)) => {
            info!(
                event_name = "chat.request.answered",
                correlation_id,
                tool_calls = reply.steps.len(),
                "chat request answered"
            );
            return (ChatOutcome::Answered, ChatReply { reply: reply.text });
        }
        Ok(Err(agent_error)) => ApplicationError::from(agent_error),
        Err(join_error) => ApplicationError::Internal(join_error.to_string()),
    };

    error!(
        event_name = "chat.request.degraded",
        correlation_id,
        reason_code = failure.reason_code(),
        error = %failure,
        "agent failed, returning fallback reply"
    );
    (
        ChatOutcome::Degraded { reason_code: failure.reason_code() },
        ChatReply { reply: state.fallback_reply().to_string() },
    )
}
