use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    ILike,
    In,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::ILike => "ilike",
            FilterOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
