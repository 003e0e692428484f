//! Answer generation.
//!
//! The [`LanguageModel`] trait abstracts the hosted text-generation API;
//! [`ResponseComposer`] builds the prompt and guarantees the user always
//! gets some text back.

pub mod composer;
pub mod prompts;

pub use composer::{ResponseComposer, FALLBACK_MESSAGE};
pub use prompts::format_answer_prompt;

use async_trait::async_trait;

use gemini_client::GeminiClient;

use crate::config::Config;
use crate::error::Result;

/// Text-generation capability needed to phrase answers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// [`LanguageModel`] backed by the Gemini API.
#[derive(Clone)]
pub struct GeminiModel {
    client: GeminiClient,
    model: String,
}

impl GeminiModel {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            GeminiClient::new(&config.gemini_api_key),
            &config.gemini_model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(self.client.generate_text(&self.model, prompt).await?)
    }
}
