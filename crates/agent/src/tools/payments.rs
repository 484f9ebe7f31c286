use std::sync::Arc;

use async_trait::async_trait;
use caio_core::{lookup_payments, PaymentLedger, PaymentLookup, PaymentRecord, PermissionDirectory};
use serde_json::{json, Value};
use tracing::info;

use super::{required_str, Tool, ToolError, PAYMENT_LOOKUP_TOOL};
use crate::llm::ToolSpec;

pub(crate) const ACCESS_DENIED: &str =
    "Acesso negado. Não identifiquei permissão de visualização para o seu usuário.";

/// Lists paid and in-flight invoices of the caller's area, gated by the permission directory.
pub struct PaymentLookupTool {
    directory: Arc<dyn PermissionDirectory>,
    ledger: Arc<dyn PaymentLedger>,
}

impl PaymentLookupTool {
    pub fn new(directory: Arc<dyn PermissionDirectory>, ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { directory, ledger }
    }
}

#[async_trait]
impl Tool for PaymentLookupTool {
    fn name(&self) -> &'static str {
        PAYMENT_LOOKUP_TOOL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: PAYMENT_LOOKUP_TOOL.to_string(),
            description: "Consulta as notas fiscais pagas e em processamento da área do usuário. \
                          Use quando o usuário perguntar de suas notas, pagamentos ou status."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_email": {
                        "type": "string",
                        "description": "Email do usuário que fez a pergunta."
                    }
                },
                "required": ["user_email"]
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let identity = required_str(PAYMENT_LOOKUP_TOOL, arguments, "user_email")?;
        let outcome = lookup_payments(self.directory.as_ref(), self.ledger.as_ref(), identity);

        info!(
            event_name = "agent.tool.invoked",
            tool = PAYMENT_LOOKUP_TOOL,
            user_email = identity,
            outcome = outcome_label(&outcome),
            "payment lookup executed"
        );

        Ok(render(&outcome))
    }
}

fn outcome_label(outcome: &PaymentLookup) -> &'static str {
    match outcome {
        PaymentLookup::AccessDenied => "access_denied",
        PaymentLookup::NoRecords { .. } => "no_records",
        PaymentLookup::Records { .. } => "records",
    }
}

fn render(outcome: &PaymentLookup) -> String {
    match outcome {
        PaymentLookup::AccessDenied => ACCESS_DENIED.to_string(),
        PaymentLookup::NoRecords { area } => {
            format!("Não encontrei notas pagas registradas para a área: {area}.")
        }
        PaymentLookup::Records { records, .. } => markdown_table(records),
    }
}

fn markdown_table(records: &[PaymentRecord]) -> String {
    let header = [
        "| area | fornecedor | valor | status | data_pagamento |".to_string(),
        "|---|---|---|---|---|".to_string(),
    ];
    let rows = records.iter().map(|record| {
        format!(
            "| {} | {} | {} | {} | {} |",
            record.area,
            record.vendor,
            record.amount,
            record.status,
            record.payment_date_label()
        )
    });
    header.into_iter().chain(rows).collect::<Vec<_>>().join("\n")
}
