//! Ollama `/api/chat` with native tool calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::{
    normalize_arguments, ChatMessage, Completion, CompletionRequest, LlmClient, LlmError,
    ToolInvocation, ToolSpec,
};

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into(), model: model.into() }
    }

    fn build_request(&self, request: &CompletionRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(convert_message).collect(),
            stream: false,
            tools: (!request.tools.is_empty())
                .then(|| request.tools.iter().map(convert_tool).collect()),
            options: OllamaOptions { temperature: request.temperature },
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(url = %url, model = %self.model, messages = request.messages.len(), "ollama request");

        let response = self.http.post(&url).json(&self.build_request(request)).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let body = response.json::<OllamaResponse>().await?;
        interpret(body)
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::Api {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

fn convert_message(message: &ChatMessage) -> OllamaMessage {
    let tool_calls = (!message.tool_calls.is_empty()).then(|| {
        message
            .tool_calls
            .iter()
            .map(|call| OllamaToolCall {
                function: OllamaToolCallFunction {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect()
    });

    OllamaMessage {
        role: message.role.as_str().to_string(),
        content: message.content.clone(),
        tool_calls,
    }
}

fn convert_tool(tool: &ToolSpec) -> OllamaTool {
    OllamaTool {
        type_field: "function".to_string(),
        function: OllamaFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn interpret(response: OllamaResponse) -> Result<Completion, LlmError> {
    let calls = response.message.tool_calls.unwrap_or_default();
    if !calls.is_empty() {
        let invocations = calls
            .into_iter()
            .map(|call| {
                let arguments = normalize_arguments(call.function.arguments)?;
                Ok(ToolInvocation::new(call.function.name, arguments))
            })
            .collect::<Result<Vec<_>, LlmError>>()?;
        return Ok(Completion::Invoke(invocations));
    }

    let content = response.message.content.trim();
    if content.is_empty() {
        return Err(LlmError::MalformedResponse(
            "ollama returned neither content nor tool calls".to_string(),
        ));
    }
    Ok(Completion::Answer(content.to_string()))
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    type_field: String,
    function: OllamaFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}
