use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_where::compare_json;
use super::is_identifier;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `"created_at desc, title"` style order strings.
    pub fn parse(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(col) = it.next() else { continue };
            if !is_identifier(col) {
                return Err(FilterError::InvalidColumn(col.to_string()));
            }
            let sort = match it.next().map(str::to_ascii_lowercase).as_deref() {
                None | Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                Some(other) => return Err(FilterError::InvalidOrder(format!("unknown direction '{}'", other))),
            };
            out.push(FilterOrderInfo { column: col.to_string(), sort });
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo], row_expr: &str) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("({}->'{}') {} NULLS LAST", row_expr, i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Row ordering matching `generate`: nulls sort last in either direction.
    pub fn compare(infos: &[FilterOrderInfo], a: &Value, b: &Value) -> Ordering {
        for info in infos {
            let left = a.get(&info.column).unwrap_or(&Value::Null);
            let right = b.get(&info.column).unwrap_or(&Value::Null);
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let natural = compare_json(left, right).unwrap_or(Ordering::Equal);
                    match info.sort {
                        SortDirection::Asc => natural,
                        SortDirection::Desc => natural.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
