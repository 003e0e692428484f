//! [`CatalogStore`] backed by Supabase's PostgREST endpoint.

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use supabase_client::{QueryBuilder, Row, SupabaseClient};

use super::CatalogStore;
use crate::config::Config;
use crate::error::Result;
use crate::query::{FilterOperator, QueryPlan, Table};

/// Hosted catalog reached over the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SupabaseClient::new(&config.supabase_url, &config.supabase_key))
    }

    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    /// Unfiltered sample of a table, keeping the client error so callers
    /// can tell a missing table from other failures.
    pub async fn sample(&self, table: Table, limit: u32) -> supabase_client::Result<Vec<Row>> {
        self.client.from(table.as_str()).limit(limit).execute().await
    }
}

/// Translate a plan into a PostgREST request.
///
/// Conditions on another table embed it with `!inner` so the filter
/// restricts the primary rows instead of only the embedded ones.
pub fn query_for<'a>(client: &'a SupabaseClient, plan: &QueryPlan) -> QueryBuilder<'a> {
    let mut query = client.from(plan.table.as_str());

    for joined in plan.joined_tables() {
        query = query.inner_join(joined.as_str());
    }

    for condition in &plan.conditions {
        let column = condition.column_from(plan.table);
        let value = condition.value.as_str();
        query = match condition.operator {
            FilterOperator::Eq => query.eq(column, value),
            FilterOperator::ILike => query.ilike(column, format!("%{value}%")),
            FilterOperator::Lt => query.lt(column, value),
            FilterOperator::Gt => query.gt(column, value),
            FilterOperator::IsNull => query.is_null(column),
        };
    }

    query.limit(plan.limit)
}

#[async_trait]
impl CatalogStore for SupabaseStore {
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        let start = Instant::now();
        let rows = query_for(&self.client, plan).execute().await?;

        debug!(
            table = %plan.table,
            conditions = plan.conditions.len(),
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog fetch complete"
        );

        Ok(rows)
    }
}
