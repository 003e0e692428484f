//! Library Catalog Chat
//!
//! A conversational front-end for a library catalog. Each question is
//! classified into an intent, mined for search terms, turned into a
//! filtered read against the hosted catalog, and answered in plain text by
//! a language model.
//!
//! # Usage
//!
//! ```rust,ignore
//! use library_chat::{Config, LibraryChatBot};
//!
//! let config = Config::from_env()?;
//! let bot = LibraryChatBot::from_config(&config);
//!
//! let turn = bot.handle("Is The C Programming Language available?").await;
//! println!("{}", turn.answer);
//! ```
//!
//! # Modules
//!
//! - [`query`] - Intent classification, term extraction, filter building
//! - [`store`] - Catalog access (Supabase) and typed record views
//! - [`responder`] - Prompt building and answer generation (Gemini)
//! - [`chatbot`] - Per-turn orchestration
//! - [`inspect`] - Schema probing
//! - [`testing`] - Mock store and model

pub mod chatbot;
pub mod config;
pub mod error;
pub mod inspect;
pub mod query;
pub mod responder;
pub mod store;
pub mod testing;

pub use chatbot::{is_quit_command, LibraryChatBot, Turn, CLARIFICATION_MESSAGE, QUIT_COMMANDS};
pub use config::Config;
pub use error::{ChatError, Result};
pub use query::{
    build_plan, classify, extract, FilterCondition, FilterOperator, IdentifierOf, Intent,
    QueryPlan, SearchTerms, Table,
};
pub use responder::{GeminiModel, LanguageModel, ResponseComposer, FALLBACK_MESSAGE};
pub use store::{CatalogStore, Retrieval, Row, SupabaseStore};
pub use testing::{MockModel, MockStore};
