use std::sync::Arc;

use async_trait::async_trait;
use caio_core::{lookup_material, MaterialCatalog, MaterialLookup};
use serde_json::{json, Value};
use tracing::info;

use super::{required_str, Tool, ToolError, MATERIAL_CODE_TOOL};
use crate::llm::ToolSpec;

pub(crate) const NOT_FOUND: &str =
    "Não encontrei um código de material para essa combinação de conta e serviço.";

/// Resolves the material code for an account and service, always stating whether payment is allowed.
pub struct MaterialCodeTool {
    catalog: Arc<dyn MaterialCatalog>,
}

impl MaterialCodeTool {
    pub fn new(catalog: Arc<dyn MaterialCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for MaterialCodeTool {
    fn name(&self) -> &'static str {
        MATERIAL_CODE_TOOL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: MATERIAL_CODE_TOOL.to_string(),
            description: "Verifica o código de material de uma conta contábil para um tipo de \
                          serviço e informa se o pagamento é permitido. Exige a conta e o serviço."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "conta": {
                        "type": "string",
                        "description": "Conta contábil no formato 00.00-0."
                    },
                    "tipo_servico": {
                        "type": "string",
                        "description": "Tipo de serviço prestado, por exemplo limpeza."
                    }
                },
                "required": ["conta", "tipo_servico"]
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let account = required_str(MATERIAL_CODE_TOOL, arguments, "conta")?;
        let service = required_str(MATERIAL_CODE_TOOL, arguments, "tipo_servico")?;
        let outcome = lookup_material(self.catalog.as_ref(), account, service);

        info!(
            event_name = "agent.tool.invoked",
            tool = MATERIAL_CODE_TOOL,
            conta = account,
            tipo_servico = service,
            payment_allowed = ?outcome.payment_allowed(),
            "material lookup executed"
        );

        Ok(render(&outcome))
    }
}

fn render(outcome: &MaterialLookup) -> String {
    match outcome {
        MaterialLookup::NotFound => NOT_FOUND.to_string(),
        MaterialLookup::Found(rule) if rule.payment_allowed => format!(
            "Encontrado! Código: {}. O pagamento é permitido nesta conta.",
            rule.material_code.0
        ),
        MaterialLookup::Found(rule) => format!(
            "Código: {}, mas ATENÇÃO: O pagamento NÃO é permitido para esta conta/serviço.",
            rule.material_code.0
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use caio_core::fixtures;
    use serde_json::json;

    use super::{MaterialCodeTool, NOT_FOUND};
    use crate::tools::{Tool, ToolError};

    fn tool() -> MaterialCodeTool {
        MaterialCodeTool::new(Arc::new(fixtures::material_catalog()))
    }

    #[tokio::test]
    async fn partial_service_text_finds_allowed_code() {
        let output =
            tool().execute(&json!({"conta": "05.06-3", "tipo_servico": "limp"})).await.expect("run");

        assert_eq!(output, "Encontrado! Código: MAT-7766. O pagamento é permitido nesta conta.");
    }

    #[tokio::test]
    async fn disallowed_account_carries_explicit_warning() {
        let output = tool()
            .execute(&json!({"conta": "01.02-1", "tipo_servico": "consultoria"}))
            .await
            .expect("run");

        assert_eq!(
            output,
            "Código: MAT-1122, mas ATENÇÃO: O pagamento NÃO é permitido para esta conta/serviço."
        );
    }

    #[tokio::test]
    async fn account_must_match_exactly() {
        let output =
            tool().execute(&json!({"conta": "05.06", "tipo_servico": "limpeza"})).await.expect("run");

        assert_eq!(output, NOT_FOUND);
    }

    #[tokio::test]
    async fn padded_account_does_not_match() {
        let output =
            tool().execute(&json!({"conta": " 05.06-3", "tipo_servico": "limp"})).await.expect("run");

        assert_eq!(output, NOT_FOUND);
    }

    #[tokio::test]
    async fn service_from_another_account_is_not_found() {
        let output = tool()
            .execute(&json!({"conta": "01.02-1", "tipo_servico": "limpeza"}))
            .await
            .expect("run");

        assert_eq!(output, NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_service_is_an_argument_error() {
        let error = tool().execute(&json!({"conta": "05.06-3"})).await.expect_err("missing");

        assert!(
            matches!(error, ToolError::InvalidArguments { ref message, .. } if message.contains("tipo_servico"))
        );
    }
}
