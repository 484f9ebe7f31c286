use std::sync::Arc;

use caio_agent::{AgentError, AgentRuntime};
use caio_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("agent runtime could not be initialized: {0}")]
    Agent(#[from] AgentError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        "starting application bootstrap"
    );

    let runtime = AgentRuntime::from_config(&config)?;
    info!(
        event_name = "system.bootstrap.agent_ready",
        correlation_id = "bootstrap",
        backend = runtime.llm().name(),
        tools = runtime.tools().len(),
        max_iterations = config.agent.max_iterations,
        "agent runtime initialized"
    );

    let state = AppState::new(Arc::new(runtime), config.agent.fallback_reply.clone());
    Ok(Application { config, state })
}
