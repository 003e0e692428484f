use serde::Deserialize;
use std::fmt;

/// A single PostgREST row, kept as loose JSON.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// PostgREST horizontal filter operators supported by the query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    ILike,
    Gt,
    Lt,
    Is,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::ILike => "ilike",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
            FilterOp::Is => "is",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `column=op.value` filter. `column` may be dotted (`books.title`) to
/// filter on an embedded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    /// Encode as a query-string pair.
    pub fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op, self.value))
    }
}

/// Error body returned by PostgREST on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestErrorBody {
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}
