//! Callable tools exposed to the model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use caio_core::{MaterialCatalog, PaymentLedger, PermissionDirectory};
use serde_json::Value;
use thiserror::Error;

use crate::llm::ToolSpec;

pub mod materials;
pub mod payments;

pub use materials::MaterialCodeTool;
pub use payments::PaymentLookupTool;

pub const PAYMENT_LOOKUP_TOOL: &str = "consultar_notas_pagas";
pub const MATERIAL_CODE_TOOL: &str = "verificar_codigo_material";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no tool named `{0}` is registered")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool `{tool}` failed: {message}")]
    Execution { tool: String, message: String },
}

impl ToolError {
    /// Errors the model can recover from by asking the user or retrying the call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::InvalidArguments { .. })
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn spec(&self) -> ToolSpec;

    /// Returns the textual observation handed back to the model.
    async fn execute(&self, arguments: &Value) -> Result<String, ToolError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    /// Tool contracts in name order, so the model sees a stable listing.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = self.tools.values().map(|tool| tool.spec()).collect::<Vec<_>>();
        specs.sort_by(|left, right| left.name.cmp(&right.name));
        specs
    }

    pub async fn dispatch(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(arguments).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// The two tools of the payments assistant, wired to shared data providers.
pub fn standard_registry(
    directory: Arc<dyn PermissionDirectory>,
    ledger: Arc<dyn PaymentLedger>,
    catalog: Arc<dyn MaterialCatalog>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(PaymentLookupTool::new(directory, ledger));
    registry.register(MaterialCodeTool::new(catalog));
    registry
}

pub(crate) fn required_str<'a>(
    tool: &str,
    arguments: &'a Value,
    field: &str,
) -> Result<&'a str, ToolError> {
    match arguments.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value),
        Some(Value::String(_)) => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("`{field}` must not be blank"),
        }),
        Some(_) => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("`{field}` must be a string"),
        }),
        None => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("missing required argument `{field}`"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use caio_core::fixtures;
    use serde_json::json;

    use super::{
        required_str, standard_registry, ToolError, ToolRegistry, MATERIAL_CODE_TOOL,
        PAYMENT_LOOKUP_TOOL,
    };

    fn registry() -> ToolRegistry {
        standard_registry(
            Arc::new(fixtures::permission_directory()),
            Arc::new(fixtures::payment_ledger()),
            Arc::new(fixtures::material_catalog()),
        )
    }

    #[test]
    fn standard_registry_exposes_both_tools_in_name_order() {
        let registry = registry();
        let names = registry.specs().into_iter().map(|spec| spec.name).collect::<Vec<_>>();

        assert_eq!(registry.len(), 2);
        assert_eq!(names, vec![PAYMENT_LOOKUP_TOOL, MATERIAL_CODE_TOOL]);
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_tool() {
        let error = registry().dispatch("apagar_tudo", &json!({})).await.expect_err("unknown");
        assert!(matches!(error, ToolError::UnknownTool(ref name) if name == "apagar_tudo"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn required_str_passes_values_through_and_rejects_blank_or_wrong_types() {
        let arguments = json!({"conta": " 05.06-3 ", "vazio": "  ", "numero": 7});

        assert_eq!(required_str("t", &arguments, "conta").expect("present"), " 05.06-3 ");
        assert!(required_str("t", &arguments, "vazio").is_err());
        assert!(required_str("t", &arguments, "numero").is_err());
        let missing = required_str("t", &arguments, "tipo_servico").expect_err("missing");
        assert!(missing.to_string().contains("tipo_servico"));
    }

    #[test]
    fn execution_failures_are_not_recoverable() {
        let error = ToolError::Execution { tool: "x".to_string(), message: "down".to_string() };
        assert!(!error.is_recoverable());
    }
}
