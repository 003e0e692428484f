use chrono::NaiveDate;
use tracing::{debug, warn};

use super::prompts::format_answer_prompt;
use super::LanguageModel;
use crate::query::Intent;
use crate::store::Retrieval;

/// Shown when the model cannot produce an answer.
pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, I couldn't put together an answer right now. Please try asking again in a moment.";

/// Turns retrieved rows into a conversational answer.
pub struct ResponseComposer<M> {
    model: M,
}

impl<M: LanguageModel> ResponseComposer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Ask the model for an answer. Never fails and never returns blank
    /// text; model errors are logged and replaced by [`FALLBACK_MESSAGE`].
    pub async fn compose(
        &self,
        question: &str,
        intent: Intent,
        retrieval: &Retrieval,
        today: NaiveDate,
    ) -> String {
        let prompt = format_answer_prompt(question, intent, retrieval, today);
        debug!(intent = %intent, prompt_len = prompt.len(), "Composing answer");

        match self.model.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(intent = %intent, "Model returned an empty answer");
                FALLBACK_MESSAGE.to_string()
            }
            Err(e) => {
                warn!(intent = %intent, error = %e, "Answer generation failed");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Table;
    use crate::testing::MockModel;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_model_text() {
        let composer = ResponseComposer::new(MockModel::new().with_answer("  Dune is on the shelf.\n"));
        let answer = composer
            .compose("Is Dune available?", Intent::AvailabilityCheck, &Retrieval::Empty { table: Table::Books }, today())
            .await;

        assert_eq!(answer, "Dune is on the shelf.");
        assert_eq!(composer.model().prompts().len(), 1);
    }

    #[tokio::test]
    async fn model_failure_yields_fallback() {
        let composer = ResponseComposer::new(MockModel::new().failing());
        let answer = composer
            .compose("Is Dune available?", Intent::AvailabilityCheck, &Retrieval::Empty { table: Table::Books }, today())
            .await;

        assert_eq!(answer, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn blank_completion_yields_fallback() {
        let composer = ResponseComposer::new(MockModel::new().with_answer("   "));
        let answer = composer
            .compose("Show overdue books", Intent::FinesOverdue, &Retrieval::Empty { table: Table::Transactions }, today())
            .await;

        assert_eq!(answer, FALLBACK_MESSAGE);
    }
}
