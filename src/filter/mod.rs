pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Query;
pub use types::*;

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, the only names ever spliced into SQL.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
