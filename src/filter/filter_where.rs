use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Compiles conditions into a WHERE clause over a jsonb row expression,
/// numbering parameters from `starting_param_index + 1`.
pub struct FilterWhere<'a> {
    row_expr: &'a str,
    param_values: Vec<Value>,
    param_index: usize,
}

impl<'a> FilterWhere<'a> {
    pub fn generate(
        conditions: &[FilterWhereInfo],
        row_expr: &'a str,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self {
            row_expr,
            param_values: vec![],
            param_index: starting_param_index,
        };

        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for condition in conditions {
            sql_conditions.push(filter_where.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, filter_where.param_values))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let field = format!("({}->'{}')", self.row_expr, condition.column);
        let data = condition.data.clone();
        Ok(match condition.operator {
            FilterOp::Eq if data.is_null() => format!("({0} IS NULL OR {0} = 'null'::jsonb)", field),
            FilterOp::Eq => format!("{} = {}", field, self.param(data)),
            FilterOp::Neq if data.is_null() => format!("({0} IS NOT NULL AND {0} <> 'null'::jsonb)", field),
            FilterOp::Neq => format!("{} IS DISTINCT FROM {}", field, self.param(data)),
            FilterOp::Gt => self.range(&field, ">", data),
            FilterOp::Gte => self.range(&field, ">=", data),
            FilterOp::Lt => self.range(&field, "<", data),
            FilterOp::Lte => self.range(&field, "<=", data),
            FilterOp::ILike => {
                if !data.is_string() {
                    return Err(FilterError::InvalidOperatorData("ilike requires a string pattern".to_string()));
                }
                let p = self.param(data);
                format!("({}->>'{}') ILIKE ({} #>> '{{}}')", self.row_expr, condition.column, p)
            }
            FilterOp::In => {
                let Value::Array(values) = data else {
                    return Err(FilterError::InvalidOperatorData("in requires an array".to_string()));
                };
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                format!("{} IN ({})", field, params.join(", "))
            }
        })
    }

    /// jsonb orders null below every string, so a range test only holds
    /// between values of the same json type.
    fn range(&mut self, field: &str, op: &str, data: Value) -> String {
        let p = self.param(data);
        format!("({0} {1} {2} AND jsonb_typeof({0}) = jsonb_typeof({2}))", field, op, p)
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// In-process evaluation with the same meaning as the generated SQL, except
/// that numeric strings also compare as numbers.
pub fn evaluate(condition: &FilterWhereInfo, row: &Value) -> bool {
    let field = row.get(&condition.column).unwrap_or(&Value::Null);
    let data = &condition.data;
    match condition.operator {
        FilterOp::Eq => json_eq(field, data),
        FilterOp::Neq => !json_eq(field, data),
        FilterOp::Gt => matches!(compare_json(field, data), Some(Ordering::Greater)),
        FilterOp::Gte => matches!(compare_json(field, data), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => matches!(compare_json(field, data), Some(Ordering::Less)),
        FilterOp::Lte => matches!(compare_json(field, data), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::ILike => match (as_text(field), data.as_str()) {
            (Some(text), Some(pattern)) => ilike(&text, pattern),
            _ => false,
        },
        FilterOp::In => data
            .as_array()
            .map(|values| values.iter().any(|v| json_eq(field, v)))
            .unwrap_or(false),
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => compare_json(a, b) == Some(Ordering::Equal),
    }
}

/// Numbers compare numerically (numeric strings included, since decimals may
/// be stored either way); strings compare lexically, which orders ISO dates.
pub fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) | (_, Value::Null) => None,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Case-insensitive LIKE: `%` any run, `_` one character, `\` escapes.
pub fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let mut tokens = Vec::new();
    let mut chars = pattern.to_lowercase().chars().collect::<Vec<_>>().into_iter();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            other => LikeToken::Literal(other),
        });
    }

    // matched[j]: text[..i] matches tokens[..j]
    let mut matched = vec![false; tokens.len() + 1];
    matched[0] = true;
    for j in 1..=tokens.len() {
        matched[j] = matched[j - 1] && tokens[j - 1] == LikeToken::AnyRun;
    }
    for ch in &text {
        let mut next = vec![false; tokens.len() + 1];
        for j in 1..=tokens.len() {
            next[j] = match tokens[j - 1] {
                LikeToken::AnyRun => next[j - 1] || matched[j],
                LikeToken::AnyOne => matched[j - 1],
                LikeToken::Literal(lit) => matched[j - 1] && lit == *ch,
            };
        }
        matched = next;
    }
    matched[tokens.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Literal(char),
    AnyRun,
    AnyOne,
}

/// Wraps a user search term as a substring pattern with wildcards escaped.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
