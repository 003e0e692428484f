//! Chat orchestration.
//!
//! One turn runs strictly in sequence:
//! classify → extract → build plan → fetch → related data → compose.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_RESULT_LIMIT};
use crate::query::{build_plan, classify, extract, Intent, QueryPlan, SearchTerms};
use crate::responder::{GeminiModel, LanguageModel, ResponseComposer};
use crate::store::{fetch_related, CatalogStore, Retrieval, SupabaseStore};

/// Reply for utterances no intent pattern recognises.
pub const CLARIFICATION_MESSAGE: &str = "I'm not sure what you're asking about. \
I can help with book searches, availability, member details, borrowing history, \
fines and overdue books, and reservations. Could you rephrase your question?";

/// Inputs that end an interactive session (case-insensitive).
pub const QUIT_COMMANDS: [&str; 4] = ["quit", "exit", "bye", "q"];

pub fn is_quit_command(input: &str) -> bool {
    let input = input.trim();
    QUIT_COMMANDS.iter().any(|cmd| input.eq_ignore_ascii_case(cmd))
}

/// Everything one turn produced, for display and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub intent: Intent,
    pub terms: SearchTerms,
    /// `None` when the intent was not recognised
    pub plan: Option<QueryPlan>,
    pub row_count: usize,
    pub lookup_failed: bool,
    pub answer: String,
}

/// Conversational front-end over a catalog store and a language model.
pub struct LibraryChatBot<S, M> {
    store: S,
    composer: ResponseComposer<M>,
    result_limit: u32,
}

impl LibraryChatBot<SupabaseStore, GeminiModel> {
    /// Wire up the hosted store and model from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SupabaseStore::from_config(config),
            GeminiModel::from_config(config),
        )
        .with_result_limit(config.result_limit)
    }
}

impl<S: CatalogStore, M: LanguageModel> LibraryChatBot<S, M> {
    pub fn new(store: S, model: M) -> Self {
        Self {
            store,
            composer: ResponseComposer::new(model),
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_result_limit(mut self, limit: u32) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn model(&self) -> &M {
        self.composer.model()
    }

    /// Answer one utterance using today's local date.
    pub async fn handle(&self, utterance: &str) -> Turn {
        self.handle_on(utterance, Local::now().date_naive()).await
    }

    /// Answer one utterance as of `today` (used for overdue checks and
    /// loan durations).
    pub async fn handle_on(&self, utterance: &str, today: NaiveDate) -> Turn {
        let start = Instant::now();
        let intent = classify(utterance);

        if intent == Intent::Unknown {
            info!(intent = %intent, "Utterance not recognised, asking to rephrase");
            return Turn {
                intent,
                terms: SearchTerms::default(),
                plan: None,
                row_count: 0,
                lookup_failed: false,
                answer: CLARIFICATION_MESSAGE.to_string(),
            };
        }

        let mut terms = extract(utterance, intent);
        // Known intents always produce a plan
        let Some(plan) = build_plan(intent, &terms, today) else {
            return Turn {
                intent,
                terms,
                plan: None,
                row_count: 0,
                lookup_failed: false,
                answer: CLARIFICATION_MESSAGE.to_string(),
            };
        };
        let mut plan = plan.with_limit(self.result_limit);
        debug!(intent = %intent, terms = %terms, sql = %plan.to_sql(), "Query planned");

        let mut retrieval = self.retrieve(intent, &plan).await;

        // "Loans for Dune" and "Loans for John Smith" read alike; try the
        // other reading before reporting nothing found.
        if matches!(retrieval, Retrieval::Empty { .. })
            && intent.is_member_centric()
            && intent.accepts_book_terms()
        {
            if let Some((swapped, alternate)) = terms.swapped_name_reading().and_then(|swapped| {
                let alternate = build_plan(intent, &swapped, today)?;
                Some((swapped, alternate.with_limit(self.result_limit)))
            }) {
                debug!(terms = %swapped, sql = %alternate.to_sql(), "No rows, trying the other name reading");
                let second = self.retrieve(intent, &alternate).await;
                if !matches!(second, Retrieval::Empty { .. }) {
                    terms = swapped;
                    plan = alternate;
                    retrieval = second;
                }
            }
        }

        let answer = self
            .composer
            .compose(utterance, intent, &retrieval, today)
            .await;

        info!(
            intent = %intent,
            rows = retrieval.row_count(),
            lookup_failed = retrieval.is_failed(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Turn complete"
        );

        Turn {
            intent,
            terms,
            row_count: retrieval.row_count(),
            lookup_failed: retrieval.is_failed(),
            plan: Some(plan),
            answer,
        }
    }

    /// Run one plan and, when it finds rows, their related lookups.
    async fn retrieve(&self, intent: Intent, plan: &QueryPlan) -> Retrieval {
        match self.store.fetch(plan).await {
            Ok(rows) => match Retrieval::from_rows(plan.table, rows) {
                Retrieval::Found { table, rows, .. } => {
                    let related =
                        fetch_related(&self.store, intent, table, &rows, self.result_limit).await;
                    Retrieval::Found {
                        table,
                        rows,
                        related,
                    }
                }
                other => other,
            },
            Err(e) => {
                warn!(table = %plan.table, error = %e, "Catalog lookup failed");
                Retrieval::Failed {
                    table: plan.table,
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterCondition, Table};
    use crate::testing::{MockModel, MockStore};
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn quit_commands_ignore_case_and_padding() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command("  EXIT "));
        assert!(is_quit_command("Bye"));
        assert!(is_quit_command("q"));
        assert!(!is_quit_command("quite"));
        assert!(!is_quit_command(""));
    }

    #[tokio::test]
    async fn unknown_intent_skips_store_and_model() {
        let bot = LibraryChatBot::new(MockStore::new(), MockModel::new());
        let turn = bot.handle_on("xyzzy plugh", today()).await;

        assert_eq!(turn.intent, Intent::Unknown);
        assert_eq!(turn.answer, CLARIFICATION_MESSAGE);
        assert!(turn.plan.is_none());
        assert!(turn.terms.is_empty());
        assert!(bot.store().calls().is_empty());
        assert!(bot.model().prompts().is_empty());
    }

    #[tokio::test]
    async fn result_limit_applies_to_plans() {
        let bot = LibraryChatBot::new(MockStore::new(), MockModel::new()).with_result_limit(3);
        let turn = bot.handle_on("Show overdue books", today()).await;

        assert_eq!(turn.plan.map(|p| p.limit), Some(3));
        assert_eq!(bot.store().calls()[0].limit, 3);
    }

    #[tokio::test]
    async fn found_books_pull_related_loans() {
        let store = MockStore::new()
            .with_rows(Table::Books, vec![
                json!({ "book_id": 1, "title": "Dune" }).as_object().unwrap().clone(),
            ])
            .with_rows(Table::Transactions, vec![
                json!({ "transaction_id": "t-1", "book_id": 1 }).as_object().unwrap().clone(),
            ]);
        let bot = LibraryChatBot::new(store, MockModel::new());
        let turn = bot.handle_on("Find Dune", today()).await;

        assert_eq!(turn.intent, Intent::BookSearch);
        assert_eq!(turn.row_count, 1);

        let tables: Vec<Table> = bot.store().calls().iter().map(|p| p.table).collect();
        assert_eq!(tables, vec![Table::Books, Table::Transactions]);
        assert!(bot.model().prompts()[0].contains("transactions for book 1: 1 records"));
    }

    #[tokio::test]
    async fn empty_title_reading_retries_as_member_name() {
        let loan = json!({ "transaction_id": "t-7", "member_id": "m-1", "book_id": 4 })
            .as_object()
            .unwrap()
            .clone();
        let store =
            MockStore::new().with_rows_for(Table::Transactions, "full_name", "John Smith", vec![loan]);
        let bot = LibraryChatBot::new(store, MockModel::new());

        let turn = bot.handle_on("Loans for John Smith", today()).await;

        assert_eq!(turn.intent, Intent::TransactionHistory);
        assert_eq!(turn.row_count, 1);
        assert_eq!(turn.terms.member_name.as_deref(), Some("John Smith"));
        assert_eq!(turn.terms.title, None);
        assert_eq!(
            turn.plan.map(|p| p.conditions),
            Some(vec![FilterCondition::ilike(Table::Members, "full_name", "John Smith")])
        );

        let fields: Vec<&str> = bot
            .store()
            .calls()
            .iter()
            .map(|p| p.conditions[0].field)
            .collect();
        assert_eq!(fields, vec!["title", "full_name"]);
    }

    #[tokio::test]
    async fn title_reading_is_kept_when_both_readings_are_empty() {
        let bot = LibraryChatBot::new(MockStore::new(), MockModel::new());

        let turn = bot.handle_on("Reservations for Dune", today()).await;

        assert_eq!(turn.row_count, 0);
        assert_eq!(turn.terms.title.as_deref(), Some("Dune"));
        assert_eq!(
            turn.plan.map(|p| p.conditions),
            Some(vec![FilterCondition::ilike(Table::Books, "title", "Dune")])
        );
        assert_eq!(bot.store().calls().len(), 2);
    }

    #[tokio::test]
    async fn each_turn_issues_its_own_queries() {
        let bot = LibraryChatBot::new(MockStore::new(), MockModel::new());

        bot.handle_on("Find Dune", today()).await;
        assert_eq!(bot.store().calls().len(), 1);

        bot.store().clear_calls();
        bot.handle_on("Member info for john@email.com", today()).await;

        let calls = bot.store().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].table, Table::Members);
    }
}
