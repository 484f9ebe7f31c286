use caio_agent::AgentRuntime;
use caio_core::config::{AppConfig, LoadOptions};
use caio_core::ApplicationError;
use serde::Serialize;

use crate::commands::{
    block_on, serialize_payload, CommandResult, EXIT_CONFIG, EXIT_FAILURE, EXIT_OK,
};

#[derive(Debug, Serialize)]
struct AskOutcome {
    command: &'static str,
    status: &'static str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason_code: Option<&'static str>,
    reply: String,
}

/// One chat turn through the same runtime the HTTP endpoint uses.
pub fn run(user_email: &str, message: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let runtime = match AgentRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("ask", "agent_runtime", error.to_string(), EXIT_FAILURE)
        }
    };

    let result = match block_on(runtime.handle_message(user_email, message)) {
        Ok(result) => result,
        Err(error) => return CommandResult::failure("ask", "async_runtime", error, EXIT_FAILURE),
    };

    let (exit_code, payload) = match result {
        Ok(reply) => (
            EXIT_OK,
            AskOutcome {
                command: "ask",
                status: "ok",
                outcome: "answered",
                reason_code: None,
                reply: reply.text,
            },
        ),
        Err(error) => {
            let failure = ApplicationError::from(error);
            (
                EXIT_FAILURE,
                AskOutcome {
                    command: "ask",
                    status: "error",
                    outcome: "degraded",
                    reason_code: Some(failure.reason_code()),
                    reply: config.agent.fallback_reply.clone(),
                },
            )
        }
    };

    CommandResult { exit_code, output: serialize_payload(&payload) }
}
