use std::env;
use std::fs;
use std::path::Path;

use caio_core::config::{detect_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_OK};

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source =
            field_source(field.key, field.env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: EXIT_OK, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<ConfigField> {
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let policy_path = config
        .agent
        .policy_path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<embedded>".to_string());

    vec![
        field("llm.provider", format!("{:?}", config.llm.provider), &["CAIO_LLM_PROVIDER"]),
        field("llm.model", config.llm.model.clone(), &["CAIO_LLM_MODEL"]),
        field("llm.base_url", config.llm.effective_base_url(), &["CAIO_LLM_BASE_URL"]),
        field("llm.api_key", llm_api_key.to_string(), &["CAIO_LLM_API_KEY"]),
        field("llm.temperature", config.llm.temperature.to_string(), &["CAIO_LLM_TEMPERATURE"]),
        field(
            "llm.timeout_secs",
            config.llm.timeout_secs.map(|secs| secs.to_string()).unwrap_or_else(|| "<unset>".to_string()),
            &["CAIO_LLM_TIMEOUT_SECS"],
        ),
        field(
            "agent.max_iterations",
            config.agent.max_iterations.to_string(),
            &["CAIO_AGENT_MAX_ITERATIONS"],
        ),
        field("agent.policy_path", policy_path, &["CAIO_AGENT_POLICY_PATH"]),
        field(
            "agent.fallback_reply",
            config.agent.fallback_reply.clone(),
            &["CAIO_AGENT_FALLBACK_REPLY"],
        ),
        field(
            "policy.assistant_name",
            config.policy.assistant_name.clone(),
            &["CAIO_POLICY_ASSISTANT_NAME"],
        ),
        field(
            "policy.payment_term_business_days",
            config.policy.payment_term_business_days.to_string(),
            &["CAIO_POLICY_PAYMENT_TERM_BUSINESS_DAYS"],
        ),
        field(
            "policy.spot_purchase_max_payments",
            config.policy.spot_purchase_max_payments.to_string(),
            &["CAIO_POLICY_SPOT_PURCHASE_MAX_PAYMENTS"],
        ),
        field(
            "policy.spot_purchase_limit",
            config.policy.spot_purchase_limit.to_string(),
            &["CAIO_POLICY_SPOT_PURCHASE_LIMIT"],
        ),
        field(
            "policy.fixed_asset_channel",
            config.policy.fixed_asset_channel.clone(),
            &["CAIO_POLICY_FIXED_ASSET_CHANNEL"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["CAIO_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["CAIO_SERVER_PORT"]),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["CAIO_LOGGING_LEVEL", "CAIO_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["CAIO_LOGGING_FORMAT", "CAIO_LOG_FORMAT"],
        ),
    ]
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigField {
    ConfigField { key, value, env_keys }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
