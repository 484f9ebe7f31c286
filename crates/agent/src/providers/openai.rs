//! OpenAI-compatible `/v1/chat/completions` with `tools` / `tool_calls`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::{
    normalize_arguments, ChatMessage, Completion, CompletionRequest, LlmClient, LlmError,
    ToolInvocation, ToolSpec,
};

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self { http, base_url: base_url.into(), model: model.into(), api_key }
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let tools = (!request.tools.is_empty())
            .then(|| request.tools.iter().map(convert_tool).collect::<Vec<_>>());
        OpenAiRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(convert_message).collect(),
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, messages = request.messages.len(), "openai request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&self.build_request(request))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let body = response.json::<OpenAiResponse>().await?;
        interpret(body)
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .send()
            .await?;
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

fn convert_message(message: &ChatMessage) -> OpenAiMessage {
    let tool_calls = (!message.tool_calls.is_empty()).then(|| {
        message
            .tool_calls
            .iter()
            .map(|call| OpenAiToolCall {
                id: call.id.clone(),
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                },
            })
            .collect()
    });

    // Assistant turns that only carry tool calls send a null content.
    let content = (tool_calls.is_none() || !message.content.is_empty())
        .then(|| message.content.clone());

    OpenAiMessage {
        role: message.role.as_str().to_string(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn convert_tool(tool: &ToolSpec) -> OpenAiTool {
    OpenAiTool {
        tool_type: "function".to_string(),
        function: OpenAiFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn interpret(response: OpenAiResponse) -> Result<Completion, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response carried no choices".to_string()))?;

    let calls = choice.message.tool_calls.unwrap_or_default();
    if !calls.is_empty() {
        let invocations = calls
            .into_iter()
            .map(|call| {
                Ok(ToolInvocation {
                    id: call.id,
                    name: call.function.name,
                    arguments: normalize_arguments(Value::String(call.function.arguments))?,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;
        return Ok(Completion::Invoke(invocations));
    }

    match choice.message.content.as_deref().map(str::trim) {
        Some(content) if !content.is_empty() => Ok(Completion::Answer(content.to_string())),
        _ => Err(LlmError::MalformedResponse(
            "choice carried neither content nor tool calls".to_string(),
        )),
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{interpret, OpenAiClient, OpenAiResponse};
    use crate::llm::{ChatMessage, Completion, CompletionRequest, LlmError, ToolInvocation, ToolSpec};

    fn client() -> OpenAiClient {
        OpenAiClient::new(
            reqwest::Client::new(),
            "https://api.openai.com",
            "gpt-4o-mini",
            "sk-test".to_string().into(),
        )
    }

    #[test]
    fn tool_turns_keep_call_ids_and_encode_arguments_as_strings() {
        let invocation = ToolInvocation {
            id: "call_abc".to_string(),
            name: "verificar_codigo_material".to_string(),
            arguments: json!({"conta": "05.06-3", "tipo_servico": "limpeza"}),
        };
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::user("codigo"),
                ChatMessage::tool_request(invocation),
                ChatMessage::tool_result("call_abc", "Encontrado!"),
            ],
            tools: vec![ToolSpec {
                name: "verificar_codigo_material".to_string(),
                description: "material".to_string(),
                parameters: json!({"type": "object"}),
            }],
            temperature: 0.0,
        };

        let body = serde_json::to_value(client().build_request(&request)).expect("serialize");

        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "verificar_codigo_material");
        assert!(body["messages"][1]["content"].is_null());
        assert_eq!(body["messages"][1]["tool_calls"][0]["id"], "call_abc");
        let encoded = body["messages"][1]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .expect("string arguments");
        assert!(encoded.contains("\"conta\":\"05.06-3\""));
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_call_id"], "call_abc");
    }

    #[test]
    fn tool_calls_preserve_provider_ids() {
        let response: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "consultar_notas_pagas",
                            "arguments": "{\"user_email\":\"maria.souza@empresa.com\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .expect("deserialize");

        let Completion::Invoke(calls) = interpret(response).expect("interpret") else {
            panic!("expected tool invocation");
        };
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arguments["user_email"], "maria.souza@empresa.com");
    }

    #[test]
    fn missing_choices_are_malformed() {
        let response: OpenAiResponse =
            serde_json::from_value(json!({"choices": []})).expect("deserialize");
        assert!(matches!(interpret(response), Err(LlmError::MalformedResponse(_))));
    }

    #[test]
    fn text_choice_becomes_answer() {
        let response: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Prazo de 15 dias úteis."}}]
        }))
        .expect("deserialize");

        assert_eq!(
            interpret(response).expect("interpret"),
            Completion::Answer("Prazo de 15 dias úteis.".to_string())
        );
    }
}
