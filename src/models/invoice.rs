use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Paid,
    Partial,
    Pending,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] =
        [InvoiceStatus::Paid, InvoiceStatus::Partial, InvoiceStatus::Pending, InvoiceStatus::Overdue];

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Partial => "Partial",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown invoice status: {}", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub case_id: Uuid,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// `INV-` followed by the last six digits of the millisecond clock.
pub fn invoice_id(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    format!("INV-{:06}", millis)
}
