//! Utterance understanding: intent, search terms, and the store query they
//! imply. Everything here is pure and deterministic.

pub mod filter;
pub mod intent;
pub mod terms;

pub use filter::{build_plan, FilterCondition, FilterOperator, QueryPlan, Table};
pub use intent::{classify, Intent, INTENT_PATTERNS};
pub use terms::{extract, IdentifierOf, SearchTerms};
