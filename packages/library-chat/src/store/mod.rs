//! Catalog data access.
//!
//! [`CatalogStore`] is the seam between the chat pipeline and the hosted
//! database. The pipeline only issues reads described by a [`QueryPlan`].

pub mod records;
pub mod supabase;

pub use records::{BookRecord, MemberRecord, ReservationRecord, TransactionRecord};
pub use supabase::SupabaseStore;
pub use supabase_client::Row;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::query::{FilterCondition, FilterOperator, Intent, QueryPlan, Table};

/// Books whose loans are looked up after a catalog search.
const RELATED_BOOKS: usize = 3;
/// Members whose loans and reservations are looked up after a member lookup.
const RELATED_MEMBERS: usize = 2;
/// Members whose fined loans are looked up after a balance lookup.
const RELATED_DEBTORS: usize = 3;

/// Read access to the library catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Run a plan and return matching rows, at most `plan.limit`.
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>>;
}

/// Rows fetched by a follow-up lookup, e.g. the loans of one book.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedSet {
    /// Short label such as `transactions for book 42`
    pub label: String,
    pub table: Table,
    pub rows: Vec<Row>,
}

/// Outcome of the store step for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Found {
        table: Table,
        rows: Vec<Row>,
        related: Vec<RelatedSet>,
    },
    Empty {
        table: Table,
    },
    /// The store call failed; the reason is for logs, never for the user.
    Failed {
        table: Table,
        reason: String,
    },
}

impl Retrieval {
    pub fn from_rows(table: Table, rows: Vec<Row>) -> Self {
        if rows.is_empty() {
            Retrieval::Empty { table }
        } else {
            Retrieval::Found {
                table,
                rows,
                related: Vec::new(),
            }
        }
    }

    pub fn table(&self) -> Table {
        match self {
            Retrieval::Found { table, .. }
            | Retrieval::Empty { table }
            | Retrieval::Failed { table, .. } => *table,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            Retrieval::Found { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Retrieval::Failed { .. })
    }
}

/// Follow-up plans for the primary rows of a turn, read from `table`.
///
/// Book lookups pull the loans of the first few books; member lookups pull
/// the loans and reservations of the first few members; balance lookups
/// pull the fined loans behind each balance.
pub fn related_plans(
    intent: Intent,
    table: Table,
    rows: &[Row],
    limit: u32,
) -> Vec<(String, QueryPlan)> {
    let mut plans = Vec::new();

    match (intent, table) {
        (Intent::BookSearch | Intent::AvailabilityCheck, Table::Books) => {
            for id in ids(rows, "book_id").take(RELATED_BOOKS) {
                let plan = QueryPlan::new(Table::Transactions)
                    .with(FilterCondition::eq(Table::Transactions, "book_id", &id))
                    .with_limit(limit);
                plans.push((format!("transactions for book {id}"), plan));
            }
        }
        (Intent::MemberInfo, Table::Members) => {
            for id in ids(rows, "member_id").take(RELATED_MEMBERS) {
                for table in [Table::Transactions, Table::Reservations] {
                    let plan = QueryPlan::new(table)
                        .with(FilterCondition::eq(table, "member_id", &id))
                        .with_limit(limit);
                    plans.push((format!("{table} for member {id}"), plan));
                }
            }
        }
        (Intent::FinesOverdue, Table::Members) => {
            for id in ids(rows, "member_id").take(RELATED_DEBTORS) {
                let plan = QueryPlan::new(Table::Transactions)
                    .with(FilterCondition::eq(Table::Transactions, "member_id", &id))
                    .with(FilterCondition::new(
                        Table::Transactions,
                        "fine",
                        FilterOperator::Gt,
                        "0",
                    ))
                    .with_limit(limit);
                plans.push((format!("fined transactions for member {id}"), plan));
            }
        }
        _ => {}
    }

    plans
}

/// Run the follow-up plans. Failed or empty lookups are skipped.
pub async fn fetch_related<S>(
    store: &S,
    intent: Intent,
    table: Table,
    rows: &[Row],
    limit: u32,
) -> Vec<RelatedSet>
where
    S: CatalogStore + ?Sized,
{
    let mut related = Vec::new();

    for (label, plan) in related_plans(intent, table, rows, limit) {
        match store.fetch(&plan).await {
            Ok(found) if found.is_empty() => {
                debug!(label = %label, "No related rows");
            }
            Ok(found) => {
                debug!(label = %label, count = found.len(), "Related rows fetched");
                related.push(RelatedSet {
                    label,
                    table: plan.table,
                    rows: found,
                });
            }
            Err(e) => {
                warn!(label = %label, error = %e, "Related lookup failed, skipping");
            }
        }
    }

    related
}

fn ids<'a>(rows: &'a [Row], column: &'a str) -> impl Iterator<Item = String> + 'a {
    rows.iter().filter_map(move |row| match row.get(column) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn book_results_relate_to_first_three_books() {
        let rows: Vec<Row> = (1..=5).map(|i| row(json!({ "book_id": i }))).collect();
        let plans = related_plans(Intent::BookSearch, Table::Books, &rows, 10);

        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].0, "transactions for book 1");
        assert_eq!(
            plans[2].1.conditions,
            vec![FilterCondition::eq(Table::Transactions, "book_id", "3")]
        );
    }

    #[test]
    fn member_results_relate_loans_and_reservations() {
        let rows = vec![
            row(json!({ "member_id": "m-1" })),
            row(json!({ "member_id": "m-2" })),
            row(json!({ "member_id": "m-3" })),
        ];
        let labels: Vec<String> = related_plans(Intent::MemberInfo, Table::Members, &rows, 10)
            .into_iter()
            .map(|(label, _)| label)
            .collect();

        assert_eq!(
            labels,
            vec![
                "transactions for member m-1",
                "reservations for member m-1",
                "transactions for member m-2",
                "reservations for member m-2",
            ]
        );
    }

    #[test]
    fn other_intents_have_no_related_data() {
        let rows = vec![row(json!({ "book_id": 1, "member_id": 2 }))];
        assert!(related_plans(Intent::FinesOverdue, Table::Transactions, &rows, 10).is_empty());
        assert!(related_plans(Intent::TransactionHistory, Table::Transactions, &rows, 10).is_empty());
    }

    #[test]
    fn balance_results_relate_fined_loans() {
        let rows = vec![row(json!({ "member_id": "m-1", "fine_balance": 4.5 }))];
        let plans = related_plans(Intent::FinesOverdue, Table::Members, &rows, 10);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].0, "fined transactions for member m-1");
        assert_eq!(
            plans[0].1.conditions,
            vec![
                FilterCondition::eq(Table::Transactions, "member_id", "m-1"),
                FilterCondition::new(Table::Transactions, "fine", FilterOperator::Gt, "0"),
            ]
        );
    }

    #[test]
    fn rows_without_ids_are_skipped() {
        let rows = vec![row(json!({ "title": "Dune" }))];
        assert!(related_plans(Intent::BookSearch, Table::Books, &rows, 10).is_empty());
    }

    #[tokio::test]
    async fn failed_related_lookups_are_skipped() {
        let store = MockStore::new()
            .with_rows(Table::Transactions, vec![row(json!({ "transaction_id": "t-1" }))])
            .failing_on(Table::Reservations);
        let members = vec![row(json!({ "member_id": "m-1" }))];

        let related = fetch_related(&store, Intent::MemberInfo, Table::Members, &members, 10).await;

        assert_eq!(related.len(), 1);
        assert_eq!(related[0].table, Table::Transactions);
        assert_eq!(store.calls().len(), 2);
    }

    #[test]
    fn retrieval_counts_rows() {
        let found = Retrieval::from_rows(Table::Books, vec![row(json!({ "book_id": 1 }))]);
        assert_eq!(found.row_count(), 1);

        let empty = Retrieval::from_rows(Table::Books, Vec::new());
        assert!(matches!(empty, Retrieval::Empty { table: Table::Books }));
        assert_eq!(empty.row_count(), 0);
    }
}
