use thiserror::Error;

pub type Result<T> = std::result::Result<T, SupabaseError>;

/// PostgREST error code for a table missing from the schema cache.
pub const MISSING_TABLE_CODE: &str = "PGRST205";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Supabase API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl SupabaseError {
    /// Whether the error means the requested table does not exist.
    pub fn is_missing_table(&self) -> bool {
        match self {
            SupabaseError::Api { code, .. } => {
                matches!(code.as_deref(), Some(MISSING_TABLE_CODE) | Some("42P01"))
            }
            _ => false,
        }
    }
}
