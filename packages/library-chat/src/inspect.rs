//! Schema probing for the hosted catalog.
//!
//! Samples each known table and infers column kinds and likely keys from
//! the values. Used by the `inspect` command to check a deployment before
//! chatting against it.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::query::Table;
use crate::store::{Row, SupabaseStore};

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}.*)?$").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Kind of a column, inferred from sample values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnKind {
    Uuid,
    Email,
    Date,
    Numeric,
    Boolean,
    Null,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Uuid => "UUID",
            ColumnKind::Email => "EMAIL",
            ColumnKind::Date => "DATE",
            ColumnKind::Numeric => "NUMERIC",
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::Null => "NULL",
            ColumnKind::Text => "TEXT",
        }
    }

    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ColumnKind::Null,
            Value::Bool(_) => ColumnKind::Boolean,
            Value::Number(_) => ColumnKind::Numeric,
            Value::String(s) if UUID_RE.is_match(s) => ColumnKind::Uuid,
            Value::String(s) if DATE_RE.is_match(s) => ColumnKind::Date,
            Value::String(s) if EMAIL_RE.is_match(s) => ColumnKind::Email,
            _ => ColumnKind::Text,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyHint {
    Primary,
    /// Target table when the column name points at a known one
    Foreign(Option<Table>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// First non-null value, shortened for display
    pub sample: String,
    pub key: Option<KeyHint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    Present {
        sampled: usize,
        columns: Vec<ColumnProfile>,
    },
    Empty,
    Missing,
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: Table,
    #[serde(flatten)]
    pub status: TableStatus,
}

impl TableReport {
    /// Classify a sampling outcome for `table`.
    pub fn from_sample(table: Table, sample: supabase_client::Result<Vec<Row>>) -> Self {
        let status = match sample {
            Ok(rows) if rows.is_empty() => TableStatus::Empty,
            Ok(rows) => TableStatus::Present {
                sampled: rows.len(),
                columns: profile_columns(table, &rows),
            },
            Err(e) if e.is_missing_table() => TableStatus::Missing,
            Err(e) => TableStatus::Unavailable {
                reason: e.to_string(),
            },
        };
        Self { table, status }
    }

    pub fn columns(&self) -> &[ColumnProfile] {
        match &self.status {
            TableStatus::Present { columns, .. } => columns,
            _ => &[],
        }
    }
}

/// Sample every known table.
pub async fn inspect_catalog(store: &SupabaseStore, limit: u32) -> Vec<TableReport> {
    let mut reports = Vec::with_capacity(Table::ALL.len());

    for table in Table::ALL {
        let report = TableReport::from_sample(table, store.sample(table, limit).await);
        match &report.status {
            TableStatus::Missing => warn!(table = %table, "Table missing from schema"),
            TableStatus::Unavailable { reason } => {
                warn!(table = %table, error = %reason, "Table sample failed")
            }
            _ => debug!(table = %table, columns = report.columns().len(), "Table sampled"),
        }
        reports.push(report);
    }

    reports
}

/// Profile the columns seen across sample rows. A column's kind comes from
/// its first non-null value.
pub fn profile_columns(table: Table, rows: &[Row]) -> Vec<ColumnProfile> {
    let mut names: Vec<&String> = Vec::new();
    for row in rows {
        for name in row.keys() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let value = rows
                .iter()
                .filter_map(|row| row.get(name))
                .find(|v| !v.is_null());

            ColumnProfile {
                name: name.clone(),
                kind: value.map_or(ColumnKind::Null, ColumnKind::of),
                sample: value.map(sample_text).unwrap_or_default(),
                key: key_hint(table, name),
            }
        })
        .collect()
}

/// `book_id` on `books` is the primary key; `book_id` on `transactions`
/// points at `books`.
pub fn key_hint(table: Table, column: &str) -> Option<KeyHint> {
    if column == "id" {
        return Some(KeyHint::Primary);
    }
    let stem = column.strip_suffix("_id")?;
    if table.as_str() == stem || table.as_str().strip_suffix('s') == Some(stem) {
        return Some(KeyHint::Primary);
    }

    let target = Table::ALL
        .into_iter()
        .find(|t| t.as_str() == stem || t.as_str().strip_suffix('s') == Some(stem));
    Some(KeyHint::Foreign(target))
}

/// Foreign-key edges `(from table, column, to table)` across reports.
pub fn relationships(reports: &[TableReport]) -> Vec<(Table, String, Table)> {
    reports
        .iter()
        .flat_map(|report| {
            report.columns().iter().filter_map(move |c| match c.key {
                Some(KeyHint::Foreign(Some(target))) => Some((report.table, c.name.clone(), target)),
                _ => None,
            })
        })
        .collect()
}

fn sample_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > 40 {
        format!("{}...", text.chars().take(40).collect::<String>())
    } else {
        text
    }
}
