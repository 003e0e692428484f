use dotenvy::dotenv;
use std::env;

use crate::error::{ChatError, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_RESULT_LIMIT: u32 = 10;

/// Application configuration loaded from environment variables.
///
/// Built once at startup and passed by reference to the components that
/// need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_key: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub result_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ChatError::ConfigurationMissing(key.to_string()))
        };

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_key = required("SUPABASE_KEY")?;
        let gemini_api_key = required("GEMINI_API_KEY")?;

        let result_limit = match lookup("RESULT_LIMIT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ChatError::InvalidConfig {
                        key: "RESULT_LIMIT".into(),
                        reason: format!("expected a positive integer, got {raw:?}"),
                    })
                }
            },
            None => DEFAULT_RESULT_LIMIT,
        };

        Ok(Self {
            supabase_url,
            supabase_key,
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            result_limit,
        })
    }
}
