use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::area::Area;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "PAGO")]
    Paid,
    #[serde(rename = "EM PROCESSAMENTO")]
    Processing,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "PAGO",
            Self::Processing => "EM PROCESSAMENTO",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub area: Area,
    pub vendor: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    /// Absent while the invoice is still being processed.
    pub payment_date: Option<NaiveDate>,
}

impl PaymentRecord {
    pub fn payment_date_label(&self) -> String {
        self.payment_date.map(|date| date.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".to_string())
    }
}
