//! Testing utilities including mock implementations.
//!
//! These let the chat pipeline run end to end without a database or a
//! model API.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{ChatError, Result};
use crate::query::{QueryPlan, Table};
use crate::responder::LanguageModel;
use crate::store::{CatalogStore, Row};

/// A mock catalog returning canned rows per table.
///
/// Filters in the plan are recorded but not applied; every fetch against a
/// table returns its canned rows, truncated to the plan's limit. Rows added
/// with [`MockStore::with_rows_for`] are returned only to plans carrying the
/// matching condition, and take precedence.
#[derive(Default, Clone)]
pub struct MockStore {
    /// Canned rows by table
    rows: Arc<RwLock<HashMap<Table, Vec<Row>>>>,

    /// Canned rows keyed by table and one `(field, value)` condition
    matched: Arc<RwLock<Vec<(Table, &'static str, String, Vec<Row>)>>>,

    /// Tables whose fetches fail
    failing: Arc<RwLock<HashSet<Table>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<QueryPlan>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add canned rows for a table.
    pub fn with_rows(self, table: Table, rows: Vec<Row>) -> Self {
        self.rows.write().unwrap().insert(table, rows);
        self
    }

    /// Add rows returned only when a plan on `table` has a condition on
    /// `field` with exactly `value`; other plans on the table see nothing.
    pub fn with_rows_for(
        self,
        table: Table,
        field: &'static str,
        value: impl Into<String>,
        rows: Vec<Row>,
    ) -> Self {
        self.matched
            .write()
            .unwrap()
            .push((table, field, value.into(), rows));
        self
    }

    /// Make every fetch against `table` fail.
    pub fn failing_on(self, table: Table) -> Self {
        self.failing.write().unwrap().insert(table);
        self
    }

    /// Make every fetch fail.
    pub fn unreachable(self) -> Self {
        self.failing.write().unwrap().extend(Table::ALL);
        self
    }

    /// Plans fetched so far, in order.
    pub fn calls(&self) -> Vec<QueryPlan> {
        self.calls.read().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl CatalogStore for MockStore {
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        self.calls.write().unwrap().push(plan.clone());

        if self.failing.read().unwrap().contains(&plan.table) {
            return Err(ChatError::QueryFailure(format!(
                "mock store unavailable for {}",
                plan.table
            )));
        }

        let matched = self.matched.read().unwrap();
        let conditional: Vec<_> = matched.iter().filter(|m| m.0 == plan.table).collect();
        if !conditional.is_empty() {
            let rows = conditional
                .iter()
                .find(|(_, field, value, _)| {
                    plan.conditions
                        .iter()
                        .any(|c| c.field == *field && c.value == *value)
                })
                .map(|(.., rows)| rows.iter().take(plan.limit as usize).cloned().collect())
                .unwrap_or_default();
            return Ok(rows);
        }

        Ok(self
            .rows
            .read()
            .unwrap()
            .get(&plan.table)
            .map(|rows| rows.iter().take(plan.limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

/// A mock model returning a fixed answer and recording every prompt.
#[derive(Clone)]
pub struct MockModel {
    answer: Arc<RwLock<String>>,
    fail: bool,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self {
            answer: Arc::new(RwLock::new("Here is what I found in the catalog.".to_string())),
            fail: false,
            prompts: Arc::default(),
        }
    }
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text every completion returns.
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        *self.answer.write().unwrap() = answer.into();
        self
    }

    /// Make every completion fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.write().unwrap().push(prompt.to_string());

        if self.fail {
            return Err(ChatError::GenerationFailure(
                "mock model quota exceeded".into(),
            ));
        }

        Ok(self.answer.read().unwrap().clone())
    }
}
