pub mod case;
pub mod invoice;
pub mod profile;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use case::{Case, CaseStatus};
pub use invoice::{invoice_id, Invoice, InvoiceStatus};
pub use profile::Profile;

/// Decode backend rows into a typed record list.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, serde_json::Error> {
    rows.into_iter().map(serde_json::from_value).collect()
}

pub fn from_row<T: DeserializeOwned>(row: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(row)
}

pub fn to_row<T: Serialize>(record: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(record)
}
