//! System policy rendering.
//!
//! The policy text is configuration: an embedded Tera template filled with the
//! `[policy]` values and the names of the registered tools. Operators can swap
//! the template through `agent.policy_path`.

use std::path::{Path, PathBuf};

use caio_core::config::PolicyConfig;
use rust_decimal::Decimal;
use tera::{Context, Tera};
use thiserror::Error;

use crate::llm::ToolSpec;
use crate::tools::{MATERIAL_CODE_TOOL, PAYMENT_LOOKUP_TOOL};

const EMBEDDED_TEMPLATE: &str = include_str!("../templates/system_policy.tera");

const IDENTITY_PREFIX: &str = "Usuário Email: ";
const MESSAGE_MARKER: &str = ". Mensagem: ";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render policy template: {0}")]
    Template(#[from] tera::Error),
    #[error("policy never mentions registered tool `{0}`")]
    UnreferencedTool(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemPolicy {
    text: String,
}

impl SystemPolicy {
    /// Renders the policy and checks that every tool the model may call is named in it.
    pub fn render(
        policy: &PolicyConfig,
        tools: &[ToolSpec],
        template_path: Option<&Path>,
    ) -> Result<Self, PolicyError> {
        let template = match template_path {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|source| PolicyError::Read { path: path.to_path_buf(), source })?,
            None => EMBEDDED_TEMPLATE.to_owned(),
        };

        let mut context = Context::new();
        context.insert("assistant_name", &policy.assistant_name);
        context.insert("payment_term_business_days", &policy.payment_term_business_days);
        context.insert("spot_purchase_max_payments", &policy.spot_purchase_max_payments);
        context.insert("spot_purchase_limit", &format_brl(policy.spot_purchase_limit));
        context.insert("fixed_asset_channel", &policy.fixed_asset_channel);
        context.insert("payment_tool", PAYMENT_LOOKUP_TOOL);
        context.insert("material_tool", MATERIAL_CODE_TOOL);

        let text = Tera::one_off(&template, &context, false)?;
        if let Some(missing) = tools.iter().find(|tool| !text.contains(tool.name.as_str())) {
            return Err(PolicyError::UnreferencedTool(missing.name.clone()));
        }

        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The single user turn the model sees for one request.
pub fn composite_input(user_email: &str, message: &str) -> String {
    format!("{IDENTITY_PREFIX}{user_email}{MESSAGE_MARKER}{message}")
}

/// Splits a composite input back into identity and message.
pub fn parse_composite_input(input: &str) -> Option<(&str, &str)> {
    let rest = input.strip_prefix(IDENTITY_PREFIX)?;
    let (identity, message) = rest.split_once(MESSAGE_MARKER)?;
    Some((identity, message))
}

/// Brazilian currency rendering, e.g. `R$ 10.000,00`.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = format!("{:.2}", amount.round_dp(2).abs());
    let (integer, cents) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents}")
}
