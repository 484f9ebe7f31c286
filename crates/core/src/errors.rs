use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("model integration failure: {0}")]
    Integration(String),
    #[error("tool execution failure: {0}")]
    ToolExecution(String),
    #[error("agent did not produce an answer within {0} iterations")]
    IterationLimit(usize),
    #[error("agent invocation aborted: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Integration(_) => "model_unavailable",
            Self::ToolExecution(_) => "tool_failure",
            Self::IterationLimit(_) => "iteration_limit",
            Self::Internal(_) => "internal_panic",
        }
    }
}
