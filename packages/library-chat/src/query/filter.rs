//! Filter construction.
//!
//! Turns an intent plus its search terms into an ordered list of
//! `(table, field, operator, value)` conditions against one primary table.
//! Conditions combine with AND. A condition on a table other than the
//! primary one filters through the embedded (inner-joined) related row.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use super::intent::Intent;
use super::terms::{IdentifierOf, SearchTerms};
use crate::config::DEFAULT_RESULT_LIMIT;

/// Tables exposed by the library data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Books,
    Members,
    Transactions,
    Reservations,
    Staff,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Books,
        Table::Members,
        Table::Transactions,
        Table::Reservations,
        Table::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Books => "books",
            Table::Members => "members",
            Table::Transactions => "transactions",
            Table::Reservations => "reservations",
            Table::Staff => "staff",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match
    Eq,
    /// Case-insensitive partial match
    ILike,
    Lt,
    Gt,
    IsNull,
}

impl FilterOperator {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::ILike => "ILIKE",
            FilterOperator::Lt => "<",
            FilterOperator::Gt => ">",
            FilterOperator::IsNull => "IS NULL",
        }
    }
}

/// One `(table, field, operator, value)` filter tuple.
///
/// `value` is the raw search value; wildcards for partial matches are added
/// when the condition is sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCondition {
    pub table: Table,
    pub field: &'static str,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterCondition {
    pub fn new(
        table: Table,
        field: &'static str,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            table,
            field,
            operator,
            value: value.into(),
        }
    }

    pub fn eq(table: Table, field: &'static str, value: impl Into<String>) -> Self {
        Self::new(table, field, FilterOperator::Eq, value)
    }

    pub fn ilike(table: Table, field: &'static str, value: impl Into<String>) -> Self {
        Self::new(table, field, FilterOperator::ILike, value)
    }

    pub fn is_null(table: Table, field: &'static str) -> Self {
        Self::new(table, field, FilterOperator::IsNull, "")
    }

    /// Column name as seen from `primary`: bare for its own fields, dotted
    /// for embedded tables.
    pub fn column_from(&self, primary: Table) -> String {
        if self.table == primary {
            self.field.to_string()
        } else {
            format!("{}.{}", self.table, self.field)
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FilterOperator::IsNull => write!(f, "{}.{} IS NULL", self.table, self.field),
            FilterOperator::ILike => write!(
                f,
                "{}.{} ILIKE '%{}%'",
                self.table,
                self.field,
                self.value.replace('\'', "''")
            ),
            op => write!(
                f,
                "{}.{} {} '{}'",
                self.table,
                self.field,
                op.sql(),
                self.value.replace('\'', "''")
            ),
        }
    }
}

/// A read against one primary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub table: Table,
    pub conditions: Vec<FilterCondition>,
    pub limit: u32,
}

impl QueryPlan {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            conditions: Vec::new(),
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Related tables the plan filters through, in first-use order.
    pub fn joined_tables(&self) -> Vec<Table> {
        let mut tables = Vec::new();
        for c in &self.conditions {
            if c.table != self.table && !tables.contains(&c.table) {
                tables.push(c.table);
            }
        }
        tables
    }

    /// SQL rendering for diagnostics only; the store is queried over REST.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.table);
        for joined in self.joined_tables() {
            sql.push_str(&format!(" JOIN {}", joined));
        }
        if !self.conditions.is_empty() {
            let clauses: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" LIMIT {}", self.limit));
        sql
    }
}

/// Build the store query for a classified utterance.
///
/// Returns `None` only for `Intent::Unknown`. Exact matches are used for
/// identifier, email and isbn; partial matches for title, author and
/// member name.
///
/// Fines questions read member balances when they only name a member and
/// fined loans otherwise; overdue questions read unreturned loans past due.
pub fn build_plan(intent: Intent, terms: &SearchTerms, today: NaiveDate) -> Option<QueryPlan> {
    let plan = match intent {
        Intent::Unknown => return None,
        Intent::BookSearch | Intent::AvailabilityCheck => {
            let mut plan = QueryPlan::new(Table::Books);
            if let Some(id) = &terms.identifier {
                plan = plan.with(FilterCondition::eq(Table::Books, "book_id", id));
            }
            with_book_terms(plan, terms)
        }
        Intent::MemberInfo => {
            let mut plan = QueryPlan::new(Table::Members);
            if let Some(id) = &terms.identifier {
                plan = plan.with(FilterCondition::eq(Table::Members, "member_id", id));
            }
            with_member_terms(plan, terms)
        }
        Intent::TransactionHistory => member_scoped(Table::Transactions, terms),
        Intent::FinesOverdue if terms.outstanding_fines => {
            if names_only_a_member(terms) {
                let mut plan = QueryPlan::new(Table::Members);
                if let Some(id) = &terms.identifier {
                    plan = plan.with(FilterCondition::eq(Table::Members, "member_id", id));
                }
                with_member_terms(plan, terms).with(FilterCondition::new(
                    Table::Members,
                    "fine_balance",
                    FilterOperator::Gt,
                    "0",
                ))
            } else {
                member_scoped(Table::Transactions, terms).with(FilterCondition::new(
                    Table::Transactions,
                    "fine",
                    FilterOperator::Gt,
                    "0",
                ))
            }
        }
        Intent::FinesOverdue => member_scoped(Table::Transactions, terms)
            .with(FilterCondition::is_null(Table::Transactions, "return_date"))
            .with(FilterCondition::new(
                Table::Transactions,
                "due_date",
                FilterOperator::Lt,
                today.format("%Y-%m-%d").to_string(),
            )),
        Intent::ReservationStatus => {
            let plan = member_scoped(Table::Reservations, terms);
            if terms.is_empty() {
                plan.with(FilterCondition::eq(Table::Reservations, "status", "Pending"))
            } else {
                plan
            }
        }
    };

    Some(plan)
}

/// Transactions and reservations: the identifier is the member's unless it
/// was given as a book's; everything else filters through the embedded book
/// or member.
fn member_scoped(table: Table, terms: &SearchTerms) -> QueryPlan {
    let mut plan = QueryPlan::new(table);
    if let Some(id) = &terms.identifier {
        let column = match terms.identifier_of {
            Some(IdentifierOf::Book) => "book_id",
            _ => "member_id",
        };
        plan = plan.with(FilterCondition::eq(table, column, id));
    }
    let plan = with_member_terms(plan, terms);
    with_book_terms(plan, terms)
}

fn names_only_a_member(terms: &SearchTerms) -> bool {
    let member_id = terms.identifier.is_some() && terms.identifier_of != Some(IdentifierOf::Book);
    let member = member_id || terms.email.is_some() || terms.member_name.is_some();
    let book = terms.isbn.is_some()
        || terms.title.is_some()
        || terms.author.is_some()
        || terms.identifier_of == Some(IdentifierOf::Book);
    member && !book
}

fn with_book_terms(mut plan: QueryPlan, terms: &SearchTerms) -> QueryPlan {
    if let Some(isbn) = &terms.isbn {
        plan = plan.with(FilterCondition::eq(Table::Books, "isbn", isbn));
    }
    if let Some(title) = &terms.title {
        plan = plan.with(FilterCondition::ilike(Table::Books, "title", title));
    }
    if let Some(author) = &terms.author {
        plan = plan.with(FilterCondition::ilike(Table::Books, "author", author));
    }
    plan
}

fn with_member_terms(mut plan: QueryPlan, terms: &SearchTerms) -> QueryPlan {
    if let Some(email) = &terms.email {
        plan = plan.with(FilterCondition::eq(Table::Members, "email", email));
    }
    if let Some(name) = &terms.member_name {
        plan = plan.with(FilterCondition::ilike(Table::Members, "full_name", name));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn title_search_is_single_partial_match() {
        let terms = SearchTerms {
            title: Some("Harry Potter and the Goblet of Fire".into()),
            ..Default::default()
        };
        let plan = build_plan(Intent::BookSearch, &terms, today()).unwrap();

        assert_eq!(plan.table, Table::Books);
        assert_eq!(
            plan.conditions,
            vec![FilterCondition::ilike(
                Table::Books,
                "title",
                "Harry Potter and the Goblet of Fire"
            )]
        );
    }

    #[test]
    fn member_email_is_exact_match() {
        let terms = SearchTerms {
            email: Some("john@email.com".into()),
            ..Default::default()
        };
        let plan = build_plan(Intent::MemberInfo, &terms, today()).unwrap();

        assert_eq!(plan.table, Table::Members);
        assert_eq!(
            plan.conditions,
            vec![FilterCondition::eq(Table::Members, "email", "john@email.com")]
        );
    }

    #[test]
    fn multiple_fields_are_anded_in_order() {
        let terms = SearchTerms {
            title: Some("Dune".into()),
            author: Some("Frank Herbert".into()),
            isbn: Some("9780441013593".into()),
            ..Default::default()
        };
        let plan = build_plan(Intent::AvailabilityCheck, &terms, today()).unwrap();
        let fields: Vec<_> = plan.conditions.iter().map(|c| (c.field, c.operator)).collect();

        assert_eq!(
            fields,
            vec![
                ("isbn", FilterOperator::Eq),
                ("title", FilterOperator::ILike),
                ("author", FilterOperator::ILike),
            ]
        );
    }

    #[test]
    fn identifier_maps_to_primary_key() {
        let terms = SearchTerms {
            identifier: Some("42".into()),
            ..Default::default()
        };

        let books = build_plan(Intent::BookSearch, &terms, today()).unwrap();
        assert_eq!(books.conditions[0], FilterCondition::eq(Table::Books, "book_id", "42"));

        let history = build_plan(Intent::TransactionHistory, &terms, today()).unwrap();
        assert_eq!(
            history.conditions[0],
            FilterCondition::eq(Table::Transactions, "member_id", "42")
        );
    }

    #[test]
    fn book_identifier_filters_loans_by_book() {
        let terms = SearchTerms {
            identifier: Some("12345".into()),
            identifier_of: Some(IdentifierOf::Book),
            ..Default::default()
        };

        let history = build_plan(Intent::TransactionHistory, &terms, today()).unwrap();
        assert_eq!(
            history.conditions,
            vec![FilterCondition::eq(Table::Transactions, "book_id", "12345")]
        );

        let holds = build_plan(Intent::ReservationStatus, &terms, today()).unwrap();
        assert_eq!(
            holds.conditions,
            vec![FilterCondition::eq(Table::Reservations, "book_id", "12345")]
        );

        let member = SearchTerms {
            identifier_of: Some(IdentifierOf::Member),
            ..terms
        };
        let history = build_plan(Intent::TransactionHistory, &member, today()).unwrap();
        assert_eq!(history.conditions[0].field, "member_id");
    }

    #[test]
    fn member_fines_read_the_balance() {
        let terms = SearchTerms {
            member_name: Some("John Smith".into()),
            outstanding_fines: true,
            ..Default::default()
        };
        let plan = build_plan(Intent::FinesOverdue, &terms, today()).unwrap();

        assert_eq!(plan.table, Table::Members);
        assert_eq!(
            plan.conditions,
            vec![
                FilterCondition::ilike(Table::Members, "full_name", "John Smith"),
                FilterCondition::new(Table::Members, "fine_balance", FilterOperator::Gt, "0"),
            ]
        );
    }

    #[test]
    fn fines_without_a_member_read_fined_loans() {
        let terms = SearchTerms {
            outstanding_fines: true,
            ..Default::default()
        };
        let plan = build_plan(Intent::FinesOverdue, &terms, today()).unwrap();
        assert_eq!(plan.table, Table::Transactions);
        assert_eq!(
            plan.conditions,
            vec![FilterCondition::new(Table::Transactions, "fine", FilterOperator::Gt, "0")]
        );

        let terms = SearchTerms {
            title: Some("Dune".into()),
            member_name: Some("John Smith".into()),
            outstanding_fines: true,
            ..Default::default()
        };
        let plan = build_plan(Intent::FinesOverdue, &terms, today()).unwrap();
        assert_eq!(plan.table, Table::Transactions);
        assert_eq!(plan.joined_tables(), vec![Table::Members, Table::Books]);
        assert!(!plan.conditions.iter().any(|c| c.field == "due_date"));
    }

    #[test]
    fn overdue_adds_intrinsic_conditions() {
        let plan = build_plan(Intent::FinesOverdue, &SearchTerms::default(), today()).unwrap();

        assert_eq!(plan.table, Table::Transactions);
        assert_eq!(
            plan.conditions,
            vec![
                FilterCondition::is_null(Table::Transactions, "return_date"),
                FilterCondition::new(
                    Table::Transactions,
                    "due_date",
                    FilterOperator::Lt,
                    "2026-10-19"
                ),
            ]
        );
    }

    #[test]
    fn transaction_terms_filter_through_joins() {
        let terms = SearchTerms {
            title: Some("Dune".into()),
            email: Some("jane@example.com".into()),
            ..Default::default()
        };
        let plan = build_plan(Intent::TransactionHistory, &terms, today()).unwrap();

        assert_eq!(plan.joined_tables(), vec![Table::Members, Table::Books]);
        assert_eq!(plan.conditions[0].column_from(plan.table), "members.email");
        assert_eq!(plan.conditions[1].column_from(plan.table), "books.title");
    }

    #[test]
    fn bare_reservation_query_lists_pending() {
        let plan = build_plan(Intent::ReservationStatus, &SearchTerms::default(), today()).unwrap();
        assert_eq!(
            plan.conditions,
            vec![FilterCondition::eq(Table::Reservations, "status", "Pending")]
        );
    }

    #[test]
    fn empty_terms_browse_primary_table() {
        let plan = build_plan(Intent::BookSearch, &SearchTerms::default(), today()).unwrap();
        assert!(plan.conditions.is_empty());
        assert_eq!(plan.to_sql(), "SELECT * FROM books LIMIT 10");
    }

    #[test]
    fn unknown_has_no_plan() {
        assert!(build_plan(Intent::Unknown, &SearchTerms::default(), today()).is_none());
    }

    #[test]
    fn sql_rendering_for_diagnostics() {
        let terms = SearchTerms {
            member_name: Some("O'Brien".into()),
            ..Default::default()
        };
        let plan = build_plan(Intent::FinesOverdue, &terms, today())
            .unwrap()
            .with_limit(5);

        assert_eq!(
            plan.to_sql(),
            "SELECT * FROM transactions JOIN members WHERE members.full_name ILIKE '%O''Brien%' \
             AND transactions.return_date IS NULL AND transactions.due_date < '2026-10-19' LIMIT 5"
        );
    }
}
