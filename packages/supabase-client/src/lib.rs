//! Pure Supabase REST (PostgREST) client.
//!
//! A minimal read-only client for the Supabase data API. Builds PostgREST
//! filter queries (`eq`, `ilike`, `gt`, `lt`, `is`), embedded inner joins and
//! row limits, and returns rows as loose JSON maps.
//!
//! # Example
//!
//! ```rust,ignore
//! use supabase_client::SupabaseClient;
//!
//! let client = SupabaseClient::new("https://xyz.supabase.co", "anon-key");
//!
//! let rows = client
//!     .from("books")
//!     .ilike("title", "%dune%")
//!     .limit(10)
//!     .execute()
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, SupabaseError, MISSING_TABLE_CODE};
pub use types::{Filter, FilterOp, PostgrestErrorBody, Row};

#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// REST endpoint for a table.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Start a `SELECT` against a table.
    pub fn from(&self, table: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder {
            client: self,
            table: table.into(),
            inner_joins: Vec::new(),
            filters: Vec::new(),
            limit: None,
        }
    }

    async fn get_rows(&self, table: &str, params: &[(String, String)]) -> Result<Vec<Row>> {
        let url = self.rest_url(table);
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| SupabaseError::Decode(e.to_string()))
    }
}

/// Builder for a filtered `SELECT`. Filters combine with AND.
pub struct QueryBuilder<'a> {
    client: &'a SupabaseClient,
    table: String,
    inner_joins: Vec<String>,
    filters: Vec<Filter>,
    limit: Option<u32>,
}

impl<'a> QueryBuilder<'a> {
    /// Embed a related table as an inner join so filters on it restrict
    /// the parent rows.
    pub fn inner_join(mut self, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        if !self.inner_joins.contains(&resource) {
            self.inner_joins.push(resource);
        }
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    /// Case-insensitive pattern match; `%` is the wildcard.
    pub fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(column, FilterOp::ILike, pattern)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Is, "null")
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Query-string pairs this builder will send. Every column is
    /// selected, plus one `!inner` embed per joined table.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut select = String::from("*");
        for resource in &self.inner_joins {
            select.push_str(&format!(",{}!inner(*)", resource));
        }

        let mut pairs = vec![("select".to_string(), select)];
        pairs.extend(self.filters.iter().map(Filter::to_query_pair));
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    pub async fn execute(self) -> Result<Vec<Row>> {
        let params = self.query_pairs();
        tracing::debug!(table = %self.table, ?params, "Supabase select");

        let rows = self.client.get_rows(&self.table, &params).await?;
        tracing::debug!(table = %self.table, count = rows.len(), "Supabase rows fetched");
        Ok(rows)
    }
}

fn api_error(status: u16, body: &str) -> SupabaseError {
    match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(err) => {
            let message = match err.hint {
                Some(hint) if !hint.is_empty() => format!("{} (hint: {})", err.message, hint),
                _ => err.message,
            };
            SupabaseError::Api {
                status,
                code: err.code,
                message,
            }
        }
        Err(_) => SupabaseError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new("https://demo.supabase.co/", "anon-key")
    }

    #[test]
    fn rest_url_trims_trailing_slash() {
        assert_eq!(
            client().rest_url("books"),
            "https://demo.supabase.co/rest/v1/books"
        );
    }

    #[test]
    fn query_pairs_encode_filters_in_order() {
        let client = client();
        let query = client
            .from("books")
            .ilike("title", "%Dune%")
            .eq("isbn", "9780441013593")
            .limit(10);

        assert_eq!(
            query.query_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("title".to_string(), "ilike.%Dune%".to_string()),
                ("isbn".to_string(), "eq.9780441013593".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn inner_joins_extend_select_once() {
        let client = client();
        let query = client
            .from("transactions")
            .inner_join("members")
            .inner_join("members")
            .eq("members.email", "jane@example.com")
            .is_null("return_date");

        let pairs = query.query_pairs();
        assert_eq!(pairs[0].1, "*,members!inner(*)");
        assert_eq!(pairs[1], ("members.email".to_string(), "eq.jane@example.com".to_string()));
        assert_eq!(pairs[2], ("return_date".to_string(), "is.null".to_string()));
    }

    #[test]
    fn api_error_parses_postgrest_body() {
        let body = r#"{"code":"PGRST205","details":null,"hint":"Perhaps you meant the table 'public.books'","message":"Could not find the table 'public.book' in the schema cache"}"#;
        let err = api_error(404, body);

        assert!(err.is_missing_table());
        match err {
            SupabaseError::Api { status, message, .. } => {
                assert_eq!(status, 404);
                assert!(message.contains("schema cache"));
                assert!(message.contains("hint: Perhaps"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn api_error_keeps_plain_body() {
        let err = api_error(500, "upstream timeout");
        assert!(!err.is_missing_table());
        assert!(err.to_string().contains("upstream timeout"));
    }
}
