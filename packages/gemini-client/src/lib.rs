//! Pure Google Gemini REST API client
//!
//! A minimal client for the Gemini `generateContent` endpoint with no
//! domain-specific logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_client::{Content, GeminiClient, GenerateRequest};
//!
//! let client = GeminiClient::from_env()?;
//!
//! let response = client.generate_content(
//!     GenerateRequest::new("gemini-2.0-flash")
//!         .content(Content::user("Hello!"))
//! ).await?;
//!
//! println!("{}", response.text);
//! ```

pub mod error;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::*;

use reqwest::Client;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Pure Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GeminiError::Config("GEMINI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies, Vertex gateways, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL for `generateContent` on a model.
    pub fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Single-prompt completion returning only the text.
    pub async fn generate_text(&self, model: &str, prompt: impl Into<String>) -> Result<String> {
        let response = self
            .generate_content(GenerateRequest::new(model).content(Content::user(prompt)))
            .await?;
        Ok(response.text)
    }

    /// Generate content.
    ///
    /// Sends the conversation to the model and returns the first candidate.
    pub async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(self.generate_url(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request failed");
                GeminiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Gemini API error");
            return Err(api_error(status.as_u16(), &error_text));
        }

        let raw: types::GenerateResponseRaw = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        let parsed = into_response(raw)?;

        debug!(
            model = %request.model,
            finish_reason = parsed.finish_reason.as_deref().unwrap_or("unknown"),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini generate content"
        );

        Ok(parsed)
    }
}

/// Turn a raw response into the first candidate's text.
fn into_response(raw: types::GenerateResponseRaw) -> Result<GenerateResponse> {
    if let Some(reason) = raw.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GeminiError::EmptyResponse(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let candidate = raw
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GeminiError::EmptyResponse("no candidates from Gemini".into()))?;

    let text = candidate
        .content
        .map(|c| c.joined_text())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GeminiError::EmptyResponse(format!(
            "candidate had no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(GenerateResponse {
        text,
        finish_reason: candidate.finish_reason,
        usage: raw.usage_metadata,
    })
}

/// Build an API error from a non-2xx body, preferring the structured message.
fn api_error(status: u16, body: &str) -> GeminiError {
    let message = serde_json::from_str::<types::ErrorEnvelope>(body)
        .map(|env| match env.error.status {
            Some(code) => format!("{}: {}", code, env.error.message),
            None => env.error.message,
        })
        .unwrap_or_else(|_| body.to_string());

    GeminiError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = GeminiClient::new("key-test").with_base_url("https://proxy.example.com/v1/");

        assert_eq!(client.api_key, "key-test");
        assert_eq!(client.base_url, "https://proxy.example.com/v1");
    }

    #[test]
    fn test_generate_url() {
        let client = GeminiClient::new("key-test");

        assert_eq!(
            client.generate_url("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            client.generate_url("models/gemini-2.0-flash"),
            client.generate_url("gemini-2.0-flash")
        );
    }

    #[test]
    fn test_api_error_uses_structured_message() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;

        match api_error(429, body) {
            GeminiError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "RESOURCE_EXHAUSTED: Quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_body() {
        match api_error(502, "Bad Gateway") {
            GeminiError::Api { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_response_rejects_empty_candidates() {
        let raw: types::GenerateResponseRaw = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(into_response(raw), Err(GeminiError::EmptyResponse(_))));

        let raw: types::GenerateResponseRaw = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}, "finishReason": "SAFETY"}]}"#,
        )
        .unwrap();
        assert!(matches!(into_response(raw), Err(GeminiError::EmptyResponse(_))));
    }

    #[test]
    fn test_into_response_keeps_text_and_usage() {
        let raw: types::GenerateResponseRaw = serde_json::from_str(
            r#"{
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Two copies are available."}]}, "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 6, "totalTokenCount": 46}
            }"#,
        )
        .unwrap();

        let response = into_response(raw).unwrap();
        assert_eq!(response.text, "Two copies are available.");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.unwrap().prompt_token_count, 40);
    }
}
