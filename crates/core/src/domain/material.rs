use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountCode(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialCode(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRule {
    pub account_code: AccountCode,
    pub service_description: String,
    pub material_code: MaterialCode,
    pub payment_allowed: bool,
}

impl MaterialRule {
    /// Exact account match plus case-insensitive substring match on the description.
    pub fn matches(&self, account_code: &str, service_type: &str) -> bool {
        self.account_code.0 == account_code
            && self.service_description.to_lowercase().contains(&service_type.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::{AccountCode, MaterialCode, MaterialRule};

    fn cleaning_rule() -> MaterialRule {
        MaterialRule {
            account_code: AccountCode("05.06-3".to_string()),
            service_description: "Limpeza".to_string(),
            material_code: MaterialCode("MAT-7766".to_string()),
            payment_allowed: true,
        }
    }

    #[test]
    fn description_match_ignores_case() {
        let rule = cleaning_rule();
        assert!(rule.matches("05.06-3", "limp"));
        assert!(rule.matches("05.06-3", "LIMPEZA"));
    }

    #[test]
    fn account_code_must_match_exactly() {
        let rule = cleaning_rule();
        assert!(!rule.matches("05.06-30", "limpeza"));
        assert!(!rule.matches(" 05.06-3", "limpeza"));
    }

    #[test]
    fn accented_descriptions_match_lowercased_input() {
        let rule = MaterialRule {
            account_code: AccountCode("05.06-3".to_string()),
            service_description: "Manutenção Predial".to_string(),
            material_code: MaterialCode("MAT-9988".to_string()),
            payment_allowed: true,
        };
        assert!(rule.matches("05.06-3", "MANUTENÇÃO"));
    }
}
