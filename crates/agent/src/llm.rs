//! The model seam: one call turns a policy, the running conversation and the
//! tool registry into either a final answer or a batch of tool invocations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self { id: format!("call_{}", Uuid::new_v4().simple()), name: name.into(), arguments }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn tool_request(invocation: ToolInvocation) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: vec![invocation],
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Contract advertised to the model for one callable tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object.
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn offers_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.name == name)
    }

    /// Trailing tool results, i.e. the observations the model has not answered yet.
    pub fn pending_observations(&self) -> Vec<&str> {
        let trailing = self
            .messages
            .iter()
            .rev()
            .take_while(|message| message.role == Role::Tool)
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();
        trailing.into_iter().rev().collect()
    }

    pub fn first_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Answer(String),
    Invoke(Vec<ToolInvocation>),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("model response could not be interpreted: {0}")]
    MalformedResponse(String),
    #[error("model client not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Some backends send tool arguments as a JSON-encoded string instead of an object.
pub(crate) fn normalize_arguments(arguments: Value) -> Result<Value, LlmError> {
    match arguments {
        Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Default::default())),
        Value::String(raw) => serde_json::from_str(&raw).map_err(|error| {
            LlmError::MalformedResponse(format!("tool arguments are not valid json: {error}"))
        }),
        Value::Null => Ok(Value::Object(Default::default())),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{normalize_arguments, ChatMessage, CompletionRequest, Role, ToolInvocation};

    #[test]
    fn pending_observations_only_returns_trailing_tool_messages() {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system("policy"),
                ChatMessage::user("hello"),
                ChatMessage::tool_request(ToolInvocation::new("a", json!({}))),
                ChatMessage::tool_result("call-1", "first"),
                ChatMessage::tool_request(ToolInvocation::new("b", json!({}))),
                ChatMessage::tool_result("call-2", "second"),
            ],
            tools: Vec::new(),
            temperature: 0.0,
        };

        assert_eq!(request.pending_observations(), vec!["second"]);
        assert_eq!(request.first_user_message(), Some("hello"));
    }

    #[test]
    fn no_pending_observations_before_any_tool_call() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::system("policy"), ChatMessage::user("hello")],
            tools: Vec::new(),
            temperature: 0.0,
        };

        assert!(request.pending_observations().is_empty());
    }

    #[test]
    fn string_arguments_are_decoded() {
        let decoded = normalize_arguments(json!("{\"conta\":\"05.06-3\"}")).expect("decode");
        assert_eq!(decoded, json!({"conta": "05.06-3"}));
        assert_eq!(normalize_arguments(json!(null)).expect("null"), json!({}));
        assert!(normalize_arguments(json!("{not json")).is_err());
    }

    #[test]
    fn invocation_ids_are_unique() {
        let first = ToolInvocation::new("a", json!({}));
        let second = ToolInvocation::new("a", json!({}));
        assert_ne!(first.id, second.id);
        assert_eq!(ChatMessage::tool_result(&first.id, "x").role, Role::Tool);
    }
}
