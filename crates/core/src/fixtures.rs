//! Mock tables seeded at process start.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::directory::StaticPermissionDirectory;
use crate::domain::area::Area;
use crate::domain::material::{AccountCode, MaterialCode, MaterialRule};
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::tables::{InMemoryMaterialCatalog, InMemoryPaymentLedger};

const USER_AREAS: &[(&str, &str)] = &[
    ("joao.silva@empresa.com", "MARKETING"),
    ("maria.souza@empresa.com", "TI"),
    ("ana.financeiro@empresa.com", "FINANCEIRO"),
];

struct PaymentSeed {
    area: &'static str,
    vendor: &'static str,
    amount: i64,
    status: PaymentStatus,
    payment_date: Option<(i32, u32, u32)>,
}

const PAYMENTS: &[PaymentSeed] = &[
    PaymentSeed {
        area: "MARKETING",
        vendor: "Agencia X",
        amount: 5000,
        status: PaymentStatus::Paid,
        payment_date: Some((2023, 10, 1)),
    },
    PaymentSeed {
        area: "TI",
        vendor: "Tech Soft",
        amount: 12000,
        status: PaymentStatus::Paid,
        payment_date: Some((2023, 10, 2)),
    },
    PaymentSeed {
        area: "MARKETING",
        vendor: "Eventos Y",
        amount: 3000,
        status: PaymentStatus::Processing,
        payment_date: None,
    },
    PaymentSeed {
        area: "RH",
        vendor: "Consultoria Z",
        amount: 8000,
        status: PaymentStatus::Paid,
        payment_date: Some((2023, 10, 5)),
    },
];

const MATERIALS: &[(&str, &str, &str, bool)] = &[
    ("05.06-3", "Manutenção Predial", "MAT-9988", true),
    ("05.06-3", "Limpeza", "MAT-7766", true),
    ("01.02-1", "Consultoria TI", "MAT-1122", false),
];

pub fn permission_directory() -> StaticPermissionDirectory {
    StaticPermissionDirectory::new(
        USER_AREAS.iter().map(|(identity, area)| (*identity, Area::new(*area))),
    )
}

pub fn payment_ledger() -> InMemoryPaymentLedger {
    InMemoryPaymentLedger::new(
        PAYMENTS
            .iter()
            .map(|seed| PaymentRecord {
                area: Area::new(seed.area),
                vendor: seed.vendor.to_string(),
                amount: Decimal::from(seed.amount),
                status: seed.status,
                payment_date: seed
                    .payment_date
                    .and_then(|(year, month, day)| NaiveDate::from_ymd_opt(year, month, day)),
            })
            .collect(),
    )
}

pub fn material_catalog() -> InMemoryMaterialCatalog {
    InMemoryMaterialCatalog::new(
        MATERIALS
            .iter()
            .map(|(account, description, material, allowed)| MaterialRule {
                account_code: AccountCode(account.to_string()),
                service_description: description.to_string(),
                material_code: MaterialCode(material.to_string()),
                payment_allowed: *allowed,
            })
            .collect(),
    )
}
