//! Read-only tabular data providers backing the lookup tools.
//!
//! Both tables are seeded once at process start and never mutated, so the
//! in-memory implementations hand out borrowed slices without locking.

use crate::domain::material::MaterialRule;
use crate::domain::payment::PaymentRecord;

pub trait PaymentLedger: Send + Sync {
    fn records(&self) -> &[PaymentRecord];
}

pub trait MaterialCatalog: Send + Sync {
    /// Rules in table order; lookups rely on this order for first-match semantics.
    fn rules(&self) -> &[MaterialRule];
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryPaymentLedger {
    records: Vec<PaymentRecord>,
}

impl InMemoryPaymentLedger {
    pub fn new(records: Vec<PaymentRecord>) -> Self {
        Self { records }
    }
}

impl PaymentLedger for InMemoryPaymentLedger {
    fn records(&self) -> &[PaymentRecord] {
        &self.records
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryMaterialCatalog {
    rules: Vec<MaterialRule>,
}

impl InMemoryMaterialCatalog {
    pub fn new(rules: Vec<MaterialRule>) -> Self {
        Self { rules }
    }
}

impl MaterialCatalog for InMemoryMaterialCatalog {
    fn rules(&self) -> &[MaterialRule] {
        &self.rules
    }
}
