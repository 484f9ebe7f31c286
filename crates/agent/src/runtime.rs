use std::sync::Arc;

use caio_core::config::AppConfig;
use caio_core::{fixtures, ApplicationError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, Completion, CompletionRequest, LlmClient, LlmError};
use crate::policy::{composite_input, PolicyError, SystemPolicy};
use crate::providers::build_client;
use crate::scratchpad::{AgentStep, Scratchpad};
use crate::tools::{standard_registry, ToolError, ToolRegistry};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// Exhausting the turn budget is a failure, not a partial answer; callers reply with the fallback.
    #[error("no final answer after {limit} model turns")]
    IterationLimit { limit: usize },
}

impl From<AgentError> for ApplicationError {
    fn from(error: AgentError) -> Self {
        match error {
            AgentError::Llm(error) => Self::Integration(error.to_string()),
            AgentError::Tool(error) => Self::ToolExecution(error.to_string()),
            AgentError::Policy(error) => Self::Configuration(error.to_string()),
            AgentError::IterationLimit { limit } => Self::IterationLimit(limit),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentReply {
    pub text: String,
    pub steps: Vec<AgentStep>,
}

/// Drives the model through tool calls until it produces a final answer.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    policy: SystemPolicy,
    temperature: f32,
    max_iterations: usize,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, policy: SystemPolicy) -> Self {
        Self { llm, tools, policy, temperature: 0.0, max_iterations: DEFAULT_MAX_ITERATIONS }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Seeded data, the configured model backend and the rendered policy.
    pub fn from_config(config: &AppConfig) -> Result<Self, AgentError> {
        let catalog = Arc::new(fixtures::material_catalog());
        let llm = build_client(config, catalog.as_ref())?;
        let tools = standard_registry(
            Arc::new(fixtures::permission_directory()),
            Arc::new(fixtures::payment_ledger()),
            catalog,
        );
        let policy =
            SystemPolicy::render(&config.policy, &tools.specs(), config.agent.policy_path.as_deref())?;

        Ok(Self::new(llm, tools, policy)
            .with_temperature(config.llm.temperature)
            .with_max_iterations(config.agent.max_iterations))
    }

    pub fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    pub fn policy(&self) -> &SystemPolicy {
        &self.policy
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn handle_message(
        &self,
        user_email: &str,
        message: &str,
    ) -> Result<AgentReply, AgentError> {
        let preamble =
            [ChatMessage::system(self.policy.text()), ChatMessage::user(composite_input(user_email, message))];
        let tool_specs = self.tools.specs();
        let mut scratchpad = Scratchpad::default();

        for turn in 1..=self.max_iterations {
            let mut messages = preamble.to_vec();
            messages.extend(scratchpad.to_messages());
            let request =
                CompletionRequest { messages, tools: tool_specs.clone(), temperature: self.temperature };

            debug!(
                event_name = "agent.model.turn",
                backend = self.llm.name(),
                turn,
                steps = scratchpad.steps().len(),
                "requesting model completion"
            );

            let invocations = match self.llm.complete(&request).await? {
                Completion::Answer(text) => {
                    return Ok(AgentReply { text, steps: scratchpad.into_steps() });
                }
                Completion::Invoke(invocations) => invocations,
            };

            for invocation in invocations {
                let observation = match self.tools.dispatch(&invocation.name, &invocation.arguments).await {
                    Ok(observation) => observation,
                    Err(error) if error.is_recoverable() => {
                        warn!(
                            event_name = "agent.tool.rejected",
                            tool = %invocation.name,
                            error = %error,
                            "tool call rejected, returning the error to the model"
                        );
                        format!("Erro ao executar a ferramenta: {error}")
                    }
                    Err(error) => return Err(error.into()),
                };
                scratchpad.record(invocation, observation);
            }
        }

        Err(AgentError::IterationLimit { limit: self.max_iterations })
    }
}
