//! Agent runtime for the Caio payments assistant.
//!
//! A request is turned into a system policy plus one composite user turn and
//! handed to a model backend through [`llm::LlmClient`]. The model either
//! answers or asks for tools; tool observations go back to the model until it
//! answers or the turn budget runs out.
//!
//! The model only chooses which lookup to run. Permission checks, record
//! filtering and material rules are deterministic code in `caio-core`.

pub mod llm;
pub mod policy;
pub mod providers;
pub mod runtime;
pub mod scratchpad;
pub mod tools;

pub use llm::{Completion, CompletionRequest, LlmClient, LlmError};
pub use policy::SystemPolicy;
pub use runtime::{AgentError, AgentReply, AgentRuntime};
pub use tools::{ToolError, ToolRegistry};
