use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{contains_pattern, evaluate, FilterWhere};
use super::is_identifier;
use super::types::{FilterOp, FilterOrderInfo, FilterWhereInfo, SqlResult};

/// Predicates, ordering and limit for a table read or update.
///
/// Builder methods never fail; `validate` runs before anything is executed,
/// so a bad column name surfaces as a `FilterError` from the backend call.
#[derive(Debug, Clone, Default)]
pub struct Query {
    conditions: Vec<FilterWhereInfo>,
    order: Vec<FilterOrderInfo>,
    order_error: Option<String>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, column: &str, operator: FilterOp, data: Value) -> Self {
        self.conditions.push(FilterWhereInfo { column: column.to_string(), operator, data });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Eq, value.into())
    }

    pub fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Neq, value.into())
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Gt, value.into())
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Gte, value.into())
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Lt, value.into())
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, FilterOp::Lte, value.into())
    }

    /// Raw LIKE pattern, `%` and `_` are live.
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.push(column, FilterOp::ILike, Value::String(pattern.to_string()))
    }

    /// Case-insensitive substring match on a literal term.
    pub fn contains(self, column: &str, term: &str) -> Self {
        self.ilike(column, &contains_pattern(term))
    }

    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(column, FilterOp::In, Value::Array(values))
    }

    pub fn order(mut self, spec: &str) -> Self {
        match FilterOrder::parse(spec) {
            Ok(infos) => self.order.extend(infos),
            Err(e) => self.order_error = Some(e.to_string()),
        }
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if let Some(err) = &self.order_error {
            return Err(FilterError::InvalidOrder(err.clone()));
        }
        for condition in &self.conditions {
            if !is_identifier(&condition.column) {
                return Err(FilterError::InvalidColumn(condition.column.clone()));
            }
        }
        Ok(())
    }

    /// True when every condition holds for `row`.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|condition| evaluate(condition, row))
    }

    /// Filter, order and truncate an in-memory row set.
    pub fn apply<'r, I>(&self, rows: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'r Value>,
    {
        let mut selected: Vec<Value> = rows.into_iter().filter(|row| self.matches(row)).cloned().collect();
        if !self.order.is_empty() {
            selected.sort_by(|a, b| FilterOrder::compare(&self.order, a, b));
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }

    /// `SELECT` returning one jsonb column named `row` per record.
    pub fn to_select_sql(&self, table: &str) -> Result<SqlResult, FilterError> {
        self.validate()?;
        if !is_identifier(table) {
            return Err(FilterError::InvalidTableName(table.to_string()));
        }

        let (where_clause, params) = FilterWhere::generate(&self.conditions, "row", 0)?;
        let order_clause = FilterOrder::generate(&self.order, "row");
        let limit_clause = self.limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default();

        let query = [
            format!("SELECT row FROM (SELECT to_jsonb(t) AS row FROM \"{}\" t) AS s", table),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    /// Bare WHERE clause over `row_expr`, for statements that build their own
    /// projection. Parameters start after `starting_param_index`.
    pub fn to_where_sql(&self, row_expr: &str, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        self.validate()?;
        let (query, params) = FilterWhere::generate(&self.conditions, row_expr, starting_param_index)?;
        Ok(SqlResult { query, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_select_sql() {
        let sql = Query::new()
            .eq("role", "client")
            .contains("full_name", "khan")
            .order("created_at desc")
            .limit(5)
            .to_select_sql("profiles")
            .unwrap();
        assert_eq!(
            sql.query,
            "SELECT row FROM (SELECT to_jsonb(t) AS row FROM \"profiles\" t) AS s \
             WHERE (row->'role') = $1 AND (row->>'full_name') ILIKE ($2 #>> '{}') \
             ORDER BY (row->'created_at') DESC NULLS LAST LIMIT 5"
        );
        assert_eq!(sql.params, vec![json!("client"), json!("%khan%")]);
    }

    #[test]
    fn unconditional_select() {
        let sql = Query::new().to_select_sql("cases").unwrap();
        assert!(sql.query.ends_with("WHERE 1=1"));
    }

    #[test]
    fn invalid_names_are_rejected_before_execution() {
        assert!(Query::new().eq("role'; --", "x").validate().is_err());
        assert!(Query::new().order("title; drop").validate().is_err());
        assert!(Query::new().to_select_sql("cases; drop").is_err());
    }

    #[test]
    fn apply_filters_orders_and_limits() {
        let rows = vec![
            json!({ "id": 1, "status": "Active", "created_at": "2026-01-01" }),
            json!({ "id": 2, "status": "Closed", "created_at": "2026-02-01" }),
            json!({ "id": 3, "status": "Active", "created_at": "2026-03-01" }),
            json!({ "id": 4, "status": "Active", "created_at": "2026-04-01" }),
        ];
        let out = Query::new().eq("status", "Active").order("created_at desc").limit(2).apply(&rows);
        let ids: Vec<i64> = out.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn where_sql_offsets_parameters() {
        let sql = Query::new().eq("id", "abc").to_where_sql("to_jsonb(t)", 1).unwrap();
        assert_eq!(sql.query, "(to_jsonb(t)->'id') = $2");
    }
}
