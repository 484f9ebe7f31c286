//! Model backends selected by `llm.provider`.

use std::sync::Arc;
use std::time::Duration;

use caio_core::config::{AppConfig, LlmProvider};
use caio_core::MaterialCatalog;

use crate::llm::{LlmClient, LlmError};

pub mod ollama;
pub mod openai;
pub mod rules;
pub mod scripted;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use rules::RuleBasedClient;
pub use scripted::{ScriptedClient, ScriptedStep};

/// Builds the configured backend. The catalog feeds the rules engine's service vocabulary.
pub fn build_client(
    config: &AppConfig,
    catalog: &dyn MaterialCatalog,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    let llm = &config.llm;
    match llm.provider {
        LlmProvider::Rules => Ok(Arc::new(RuleBasedClient::new(
            config.policy.clone(),
            RuleBasedClient::vocabulary_from(catalog),
        ))),
        LlmProvider::Ollama => {
            Ok(Arc::new(OllamaClient::new(http_client(llm.timeout_secs)?, llm.effective_base_url(), &llm.model)))
        }
        LlmProvider::OpenAi => {
            let api_key = llm.api_key.clone().ok_or_else(|| {
                LlmError::NotConfigured("llm.api_key is required for the openai provider".to_string())
            })?;
            Ok(Arc::new(OpenAiClient::new(
                http_client(llm.timeout_secs)?,
                llm.effective_base_url(),
                &llm.model,
                api_key,
            )))
        }
    }
}

fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(seconds) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(seconds));
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use caio_core::config::{AppConfig, LlmProvider};
    use caio_core::fixtures;

    use super::build_client;
    use crate::llm::LlmError;

    #[test]
    fn provider_selection_follows_config() {
        let catalog = fixtures::material_catalog();
        let mut config = AppConfig::default();

        assert_eq!(build_client(&config, &catalog).expect("ollama").name(), "ollama");

        config.llm.provider = LlmProvider::Rules;
        assert_eq!(build_client(&config, &catalog).expect("rules").name(), "rules");

        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = Some("sk-test".to_string().into());
        config.llm.timeout_secs = Some(30);
        assert_eq!(build_client(&config, &catalog).expect("openai").name(), "openai");
    }

    #[test]
    fn openai_without_key_is_not_configured() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::OpenAi;

        let error = build_client(&config, &fixtures::material_catalog()).err().expect("missing key");
        assert!(matches!(error, LlmError::NotConfigured(_)));
    }
}
