//! Typed lookups behind the two agent tools.
//!
//! Denials and misses are ordinary outcomes here, not errors: the caller is a
//! language model that turns them into conversation.

use crate::directory::PermissionDirectory;
use crate::domain::area::Area;
use crate::domain::material::MaterialRule;
use crate::domain::payment::PaymentRecord;
use crate::tables::{MaterialCatalog, PaymentLedger};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentLookup {
    AccessDenied,
    NoRecords { area: Area },
    Records { area: Area, records: Vec<PaymentRecord> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaterialLookup {
    NotFound,
    Found(MaterialRule),
}

impl MaterialLookup {
    /// `None` when nothing matched, otherwise the compliance flag of the matched rule.
    pub fn payment_allowed(&self) -> Option<bool> {
        match self {
            Self::NotFound => None,
            Self::Found(rule) => Some(rule.payment_allowed),
        }
    }
}

pub fn lookup_payments(
    directory: &dyn PermissionDirectory,
    ledger: &dyn PaymentLedger,
    identity: &str,
) -> PaymentLookup {
    let Some(area) = directory.area_for(identity) else {
        return PaymentLookup::AccessDenied;
    };

    let records =
        ledger.records().iter().filter(|record| record.area == area).cloned().collect::<Vec<_>>();

    if records.is_empty() {
        PaymentLookup::NoRecords { area }
    } else {
        PaymentLookup::Records { area, records }
    }
}

/// Reports the first rule in table order, even when several rules match.
pub fn lookup_material(
    catalog: &dyn MaterialCatalog,
    account_code: &str,
    service_type: &str,
) -> MaterialLookup {
    catalog
        .rules()
        .iter()
        .find(|rule| rule.matches(account_code, service_type))
        .cloned()
        .map(MaterialLookup::Found)
        .unwrap_or(MaterialLookup::NotFound)
}

#[cfg(test)]
mod tests {
    use super::{lookup_material, lookup_payments, MaterialLookup, PaymentLookup};
    use crate::domain::area::Area;
    use crate::domain::material::{AccountCode, MaterialCode, MaterialRule};
    use crate::fixtures;
    use crate::tables::InMemoryMaterialCatalog;

    #[test]
    fn unknown_identity_is_denied_without_records() {
        let directory = fixtures::permission_directory();
        let ledger = fixtures::payment_ledger();

        for identity in ["", "intruso@empresa.com", "MARIA.SOUZA@EMPRESA.COM"] {
            assert_eq!(lookup_payments(&directory, &ledger, identity), PaymentLookup::AccessDenied);
        }
    }

    #[test]
    fn known_identity_sees_exactly_its_area() {
        let directory = fixtures::permission_directory();
        let ledger = fixtures::payment_ledger();

        let lookup = lookup_payments(&directory, &ledger, "joao.silva@empresa.com");
        let PaymentLookup::Records { area, records } = lookup else {
            panic!("expected records for marketing, got {lookup:?}");
        };

        assert_eq!(area, Area::new("MARKETING"));
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| record.area == area));
        assert_eq!(
            records.iter().map(|record| record.vendor.as_str()).collect::<Vec<_>>(),
            vec!["Agencia X", "Eventos Y"]
        );
    }

    #[test]
    fn tech_identity_gets_only_tech_soft() {
        let directory = fixtures::permission_directory();
        let ledger = fixtures::payment_ledger();

        let lookup = lookup_payments(&directory, &ledger, "maria.souza@empresa.com");
        let PaymentLookup::Records { records, .. } = lookup else {
            panic!("expected records for TI, got {lookup:?}");
        };

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vendor, "Tech Soft");
    }

    #[test]
    fn area_without_records_reports_no_records() {
        let directory = fixtures::permission_directory();
        let ledger = fixtures::payment_ledger();

        assert_eq!(
            lookup_payments(&directory, &ledger, "ana.financeiro@empresa.com"),
            PaymentLookup::NoRecords { area: Area::new("FINANCEIRO") }
        );
    }

    #[test]
    fn cleaning_substring_resolves_allowed_material() {
        let catalog = fixtures::material_catalog();

        let lookup = lookup_material(&catalog, "05.06-3", "limp");
        let MaterialLookup::Found(ref rule) = lookup else {
            panic!("expected a match, got {lookup:?}");
        };

        assert_eq!(rule.material_code, MaterialCode("MAT-7766".to_string()));
        assert_eq!(lookup.payment_allowed(), Some(true));
    }

    #[test]
    fn consulting_account_is_found_but_disallowed() {
        let catalog = fixtures::material_catalog();

        let lookup = lookup_material(&catalog, "01.02-1", "consultoria");

        assert!(matches!(
            lookup,
            MaterialLookup::Found(ref rule) if rule.material_code.0 == "MAT-1122"
        ));
        assert_eq!(lookup.payment_allowed(), Some(false));
    }

    #[test]
    fn not_found_requires_both_predicates() {
        let catalog = fixtures::material_catalog();

        assert_eq!(lookup_material(&catalog, "05.06-3", "consultoria"), MaterialLookup::NotFound);
        assert_eq!(lookup_material(&catalog, "99.99-9", "limpeza"), MaterialLookup::NotFound);
        assert_eq!(lookup_material(&catalog, "01.02-1", "limpeza"), MaterialLookup::NotFound);
        assert_eq!(lookup_material(&catalog, "05.06-3", "limpeza").payment_allowed(), Some(true));
    }

    // Known limitation: overlapping rules resolve to table order, not to the most specific rule.
    #[test]
    fn overlapping_rules_report_only_the_first_match() {
        let catalog = InMemoryMaterialCatalog::new(vec![
            MaterialRule {
                account_code: AccountCode("05.06-3".to_string()),
                service_description: "Limpeza Geral".to_string(),
                material_code: MaterialCode("MAT-0001".to_string()),
                payment_allowed: false,
            },
            MaterialRule {
                account_code: AccountCode("05.06-3".to_string()),
                service_description: "Limpeza".to_string(),
                material_code: MaterialCode("MAT-0002".to_string()),
                payment_allowed: true,
            },
        ]);

        let lookup = lookup_material(&catalog, "05.06-3", "limpeza");

        assert!(matches!(
            lookup,
            MaterialLookup::Found(ref rule) if rule.material_code.0 == "MAT-0001"
        ));
        assert_eq!(lookup.payment_allowed(), Some(false));
    }
}
