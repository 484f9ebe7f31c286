//! Offline keyword rules standing in for a language model.
//!
//! Deterministic and network-free, so the service stays usable without a
//! model backend and the tool-selection fixtures can run in CI.

use std::collections::BTreeSet;

use async_trait::async_trait;
use caio_core::config::PolicyConfig;
use caio_core::MaterialCatalog;
use serde_json::json;

use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError, ToolInvocation};
use crate::policy::{format_brl, parse_composite_input};
use crate::tools::{MATERIAL_CODE_TOOL, PAYMENT_LOOKUP_TOOL};

const PAYMENT_KEYWORDS: &[&str] = &["nota", "paga", "pagamento", "status", "orçamento", "orcamento"];
const SERVICE_MARKERS: &[&str] = &["serviço", "servico"];
const STOPWORDS: &[&str] = &["de", "da", "do", "das", "dos", "e", "o", "a", "para", "é", "prestado"];
const MIN_VOCABULARY_WORD: usize = 4;

pub struct RuleBasedClient {
    policy: PolicyConfig,
    vocabulary: BTreeSet<String>,
}

impl RuleBasedClient {
    pub fn new(policy: PolicyConfig, vocabulary: impl IntoIterator<Item = String>) -> Self {
        Self { policy, vocabulary: vocabulary.into_iter().collect() }
    }

    /// Service words known to the catalog, e.g. `limpeza` or `manutenção`.
    pub fn vocabulary_from(catalog: &dyn MaterialCatalog) -> BTreeSet<String> {
        catalog
            .rules()
            .iter()
            .flat_map(|rule| words(&rule.service_description.to_lowercase()))
            .filter(|word| word.chars().count() >= MIN_VOCABULARY_WORD)
            .collect()
    }

    fn decide(&self, request: &CompletionRequest) -> Completion {
        let observations = request.pending_observations();
        if !observations.is_empty() {
            return Completion::Answer(format!(
                "Consultei as informações solicitadas. Aqui está o que encontrei:\n\n{}",
                observations.join("\n\n")
            ));
        }

        let input = request.first_user_message().unwrap_or_default();
        let (identity, message) = match parse_composite_input(input) {
            Some((identity, message)) => (Some(identity).filter(|id| !id.is_empty()), message),
            None => (None, input),
        };
        let lower = message.to_lowercase();

        if let Some(account) = find_account_code(&lower) {
            return match self.service_type(&lower) {
                Some(service) if request.offers_tool(MATERIAL_CODE_TOOL) => {
                    Completion::Invoke(vec![ToolInvocation::new(
                        MATERIAL_CODE_TOOL,
                        json!({"conta": account, "tipo_servico": service}),
                    )])
                }
                Some(_) => Completion::Answer(fallback_answer()),
                None => Completion::Answer(format!(
                    "Para a conta {account}, preciso que me informe: Qual é o tipo de serviço prestado?"
                )),
            };
        }

        if lower.contains("material") {
            return Completion::Answer(
                "Para localizar o código de material, preciso que me informe a conta contábil \
                 e o tipo de serviço prestado."
                    .to_string(),
            );
        }

        if let Some(answer) = self.policy_answer(&lower) {
            return Completion::Answer(answer);
        }

        if PAYMENT_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
            return match identity {
                Some(identity) if request.offers_tool(PAYMENT_LOOKUP_TOOL) => {
                    Completion::Invoke(vec![ToolInvocation::new(
                        PAYMENT_LOOKUP_TOOL,
                        json!({"user_email": identity}),
                    )])
                }
                Some(_) => Completion::Answer(fallback_answer()),
                None => Completion::Answer(
                    "Não consegui identificar seu usuário para consultar os dados da sua área."
                        .to_string(),
                ),
            };
        }

        Completion::Answer(fallback_answer())
    }

    fn policy_answer(&self, lower: &str) -> Option<String> {
        if lower.contains("prazo") {
            return Some(format!(
                "O pagamento de NF ocorre em {} dias úteis após o recebimento.",
                self.policy.payment_term_business_days
            ));
        }
        if lower.contains("pontual") {
            return Some(format!(
                "Compras pontuais: limite de {} pagamentos ao mesmo fornecedor e valor máximo de {}.",
                self.policy.spot_purchase_max_payments,
                format_brl(self.policy.spot_purchase_limit)
            ));
        }
        if lower.contains("imobilizado") {
            return Some(format!(
                "Pedidos de ativo imobilizado devem ser feitos com a área de {}.",
                self.policy.fixed_asset_channel
            ));
        }
        None
    }

    /// Text after a service marker wins; otherwise any word the catalog knows.
    fn service_type(&self, lower: &str) -> Option<String> {
        for marker in SERVICE_MARKERS {
            if let Some(position) = lower.find(marker) {
                let after = &lower[position + marker.len()..];
                if let Some(word) = words(after).into_iter().find(|word| !STOPWORDS.contains(&word.as_str())) {
                    return Some(word);
                }
            }
        }

        words(lower).into_iter().find(|word| {
            word.chars().count() >= MIN_VOCABULARY_WORD
                && self.vocabulary.iter().any(|known| known.starts_with(word.as_str()))
        })
    }
}

#[async_trait]
impl LlmClient for RuleBasedClient {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        Ok(self.decide(request))
    }
}

fn fallback_answer() -> String {
    "Entendido. Como posso ajudar com pagamentos, notas ou códigos de material?".to_string()
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// First `NN.NN-N` token not embedded in a longer number.
fn find_account_code(text: &str) -> Option<&str> {
    const SHAPE: &[u8] = b"dd.dd-d";
    let bytes = text.as_bytes();
    if bytes.len() < SHAPE.len() {
        return None;
    }

    (0..=bytes.len() - SHAPE.len()).find_map(|start| {
        let window = &bytes[start..start + SHAPE.len()];
        let shaped = window.iter().zip(SHAPE).all(|(byte, expected)| match expected {
            b'd' => byte.is_ascii_digit(),
            other => byte == other,
        });
        let left_clear = start == 0 || !bytes[start - 1].is_ascii_digit();
        let right_clear = bytes.get(start + SHAPE.len()).map_or(true, |byte| !byte.is_ascii_digit());
        (shaped && left_clear && right_clear).then(|| &text[start..start + SHAPE.len()])
    })
}
