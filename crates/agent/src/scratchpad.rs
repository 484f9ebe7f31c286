//! Tool calls and their observations accumulated during one request.

use crate::llm::{ChatMessage, ToolInvocation};

#[derive(Clone, Debug, PartialEq)]
pub struct AgentStep {
    pub invocation: ToolInvocation,
    pub observation: String,
}

#[derive(Clone, Debug, Default)]
pub struct Scratchpad {
    steps: Vec<AgentStep>,
}

impl Scratchpad {
    pub fn record(&mut self, invocation: ToolInvocation, observation: impl Into<String>) {
        self.steps.push(AgentStep { invocation, observation: observation.into() });
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<AgentStep> {
        self.steps
    }

    /// Each step as an assistant tool request followed by its tool result.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.steps
            .iter()
            .flat_map(|step| {
                [
                    ChatMessage::tool_request(step.invocation.clone()),
                    ChatMessage::tool_result(step.invocation.id.clone(), step.observation.clone()),
                ]
            })
            .collect()
    }
}
