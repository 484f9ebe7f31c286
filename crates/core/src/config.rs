use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FALLBACK_REPLY: &str =
    "Desculpe, meu sistema local está sobrecarregado no momento. Tente novamente em instantes.";

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub policy: PolicyConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// Unset means the HTTP client never gives up on a stalled model call.
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub policy_path: Option<PathBuf>,
    pub fallback_reply: String,
}

/// Business rules interpolated into the system policy.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyConfig {
    pub assistant_name: String,
    pub payment_term_business_days: u32,
    pub spot_purchase_max_payments: u32,
    pub spot_purchase_limit: Decimal,
    pub fixed_asset_channel: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
    Rules,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub policy_path: Option<PathBuf>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                temperature: 0.0,
                timeout_secs: None,
            },
            agent: AgentConfig {
                max_iterations: 15,
                policy_path: None,
                fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            },
            policy: PolicyConfig::default(),
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 8000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Caio".to_string(),
            payment_term_business_days: 15,
            spot_purchase_max_payments: 5,
            spot_purchase_limit: Decimal::new(1_000_000, 2),
            fixed_asset_channel: "Compras (contratos)".to_string(),
        }
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> String {
        let base_url = match (&self.base_url, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, LlmProvider::OpenAi) => DEFAULT_OPENAI_URL,
            (None, LlmProvider::Ollama | LlmProvider::Rules) => DEFAULT_OLLAMA_URL,
        };
        base_url.trim_end_matches('/').to_string()
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "rules" => Ok(Self::Rules),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected ollama|openai|rules)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("caio.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = Some(timeout_secs);
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_iterations) = agent.max_iterations {
                self.agent.max_iterations = max_iterations;
            }
            if let Some(policy_path) = agent.policy_path {
                self.agent.policy_path = Some(policy_path);
            }
            if let Some(fallback_reply) = agent.fallback_reply {
                self.agent.fallback_reply = fallback_reply;
            }
        }

        if let Some(policy) = patch.policy {
            if let Some(assistant_name) = policy.assistant_name {
                self.policy.assistant_name = assistant_name;
            }
            if let Some(days) = policy.payment_term_business_days {
                self.policy.payment_term_business_days = days;
            }
            if let Some(max_payments) = policy.spot_purchase_max_payments {
                self.policy.spot_purchase_max_payments = max_payments;
            }
            if let Some(limit) = policy.spot_purchase_limit {
                self.policy.spot_purchase_limit = limit;
            }
            if let Some(channel) = policy.fixed_asset_channel {
                self.policy.fixed_asset_channel = channel;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CAIO_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CAIO_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CAIO_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CAIO_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CAIO_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("CAIO_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("CAIO_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = Some(parse_u64("CAIO_LLM_TIMEOUT_SECS", &value)?);
        }

        if let Some(value) = read_env("CAIO_AGENT_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_usize("CAIO_AGENT_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("CAIO_AGENT_POLICY_PATH") {
            self.agent.policy_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("CAIO_AGENT_FALLBACK_REPLY") {
            self.agent.fallback_reply = value;
        }

        if let Some(value) = read_env("CAIO_POLICY_ASSISTANT_NAME") {
            self.policy.assistant_name = value;
        }
        if let Some(value) = read_env("CAIO_POLICY_PAYMENT_TERM_BUSINESS_DAYS") {
            self.policy.payment_term_business_days =
                parse_u32("CAIO_POLICY_PAYMENT_TERM_BUSINESS_DAYS", &value)?;
        }
        if let Some(value) = read_env("CAIO_POLICY_SPOT_PURCHASE_MAX_PAYMENTS") {
            self.policy.spot_purchase_max_payments =
                parse_u32("CAIO_POLICY_SPOT_PURCHASE_MAX_PAYMENTS", &value)?;
        }
        if let Some(value) = read_env("CAIO_POLICY_SPOT_PURCHASE_LIMIT") {
            self.policy.spot_purchase_limit =
                parse_decimal("CAIO_POLICY_SPOT_PURCHASE_LIMIT", &value)?;
        }
        if let Some(value) = read_env("CAIO_POLICY_FIXED_ASSET_CHANNEL") {
            self.policy.fixed_asset_channel = value;
        }

        if let Some(value) = read_env("CAIO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CAIO_SERVER_PORT") {
            self.server.port = parse_u16("CAIO_SERVER_PORT", &value)?;
        }

        let log_level = read_env("CAIO_LOGGING_LEVEL").or_else(|| read_env("CAIO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("CAIO_LOGGING_FORMAT").or_else(|| read_env("CAIO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(policy_path) = overrides.policy_path {
            self.agent.policy_path = Some(policy_path);
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_agent(&self.agent)?;
        validate_policy(&self.policy)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("caio.toml"), PathBuf::from("config/caio.toml")]
        .into_iter()
        .find(|path| path.exists())
}

/// Path of the config file `AppConfig::load` would read with default options.
pub fn detect_config_path() -> Option<PathBuf> {
    resolve_config_path(None)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if let Some(timeout_secs) = llm.timeout_secs {
        if timeout_secs == 0 || timeout_secs > 600 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be in range 1..=600 when set".to_string(),
            ));
        }
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider (set CAIO_LLM_API_KEY)"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama | LlmProvider::Rules => {}
    }

    if llm.provider != LlmProvider::Rules && llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_iterations == 0 || agent.max_iterations > 100 {
        return Err(ConfigError::Validation(
            "agent.max_iterations must be in range 1..=100".to_string(),
        ));
    }

    if agent.fallback_reply.trim().is_empty() {
        return Err(ConfigError::Validation("agent.fallback_reply must not be blank".to_string()));
    }

    Ok(())
}

fn validate_policy(policy: &PolicyConfig) -> Result<(), ConfigError> {
    if policy.assistant_name.trim().is_empty() {
        return Err(ConfigError::Validation("policy.assistant_name must not be blank".to_string()));
    }

    if policy.spot_purchase_limit <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "policy.spot_purchase_limit must be greater than zero".to_string(),
        ));
    }

    if policy.payment_term_business_days == 0 || policy.spot_purchase_max_payments == 0 {
        return Err(ConfigError::Validation(
            "policy.payment_term_business_days and policy.spot_purchase_max_payments must be greater than zero"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be blank".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    policy: Option<PolicyPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_iterations: Option<usize>,
    policy_path: Option<PathBuf>,
    fallback_reply: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyPatch {
    assistant_name: Option<String>,
    payment_term_business_days: Option<u32>,
    spot_purchase_max_payments: Option<u32>,
    spot_purchase_limit: Option<Decimal>,
    fixed_asset_channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
