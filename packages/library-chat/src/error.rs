//! Typed errors for the library chat pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`); the binary wraps these
//! with context.

use thiserror::Error;

/// Errors that can occur while serving a chat turn or starting up.
///
/// An unclassifiable utterance is not an error: it resolves to
/// [`Intent::Unknown`](crate::query::Intent::Unknown) and the bot asks the
/// user to rephrase.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Required credential absent or blank at startup
    #[error("missing configuration: {0} must be set")]
    ConfigurationMissing(String),

    /// Configuration value present but unusable
    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    /// External store call failed
    #[error("catalog query failed: {0}")]
    QueryFailure(String),

    /// External model call failed (network, quota, malformed response)
    #[error("response generation failed: {0}")]
    GenerationFailure(String),
}

impl From<supabase_client::SupabaseError> for ChatError {
    fn from(err: supabase_client::SupabaseError) -> Self {
        ChatError::QueryFailure(err.to_string())
    }
}

impl From<gemini_client::GeminiError> for ChatError {
    fn from(err: gemini_client::GeminiError) -> Self {
        ChatError::GenerationFailure(err.to_string())
    }
}

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
