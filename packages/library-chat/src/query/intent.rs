//! Rule-based intent classification.
//!
//! An utterance is matched against an ordered table of `(Intent, pattern)`
//! pairs. The first matching row wins, so the table order is the priority
//! order: fines/overdue phrases sit above the generic book phrases so that
//! "show overdue books" is not read as a catalog search.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// What the user is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    BookSearch,
    AvailabilityCheck,
    MemberInfo,
    TransactionHistory,
    FinesOverdue,
    ReservationStatus,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Intent::BookSearch,
        Intent::AvailabilityCheck,
        Intent::MemberInfo,
        Intent::TransactionHistory,
        Intent::FinesOverdue,
        Intent::ReservationStatus,
        Intent::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::BookSearch => "book_search",
            Intent::AvailabilityCheck => "availability_check",
            Intent::MemberInfo => "member_info",
            Intent::TransactionHistory => "transaction_history",
            Intent::FinesOverdue => "fines_overdue",
            Intent::ReservationStatus => "reservation_status",
            Intent::Unknown => "unknown",
        }
    }

    /// Intents whose lookups are keyed on a member rather than a book.
    pub fn is_member_centric(&self) -> bool {
        matches!(
            self,
            Intent::MemberInfo
                | Intent::TransactionHistory
                | Intent::FinesOverdue
                | Intent::ReservationStatus
        )
    }

    /// Intents that can be narrowed by a book's title or author.
    pub fn accepts_book_terms(&self) -> bool {
        !matches!(self, Intent::MemberInfo | Intent::Unknown)
    }

    /// Intents where free text left over after extraction names a book.
    pub fn reads_remainder_as_title(&self) -> bool {
        matches!(
            self,
            Intent::BookSearch
                | Intent::AvailabilityCheck
                | Intent::TransactionHistory
                | Intent::ReservationStatus
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered classification table, matched against the lowercased utterance.
pub const INTENT_PATTERNS: &[(Intent, &str)] = &[
    // Fines and overdue
    (Intent::FinesOverdue, r"\boverdue\b"),
    (Intent::FinesOverdue, r"\bfines?\b"),
    (Intent::FinesOverdue, r"\bfees?\b"),
    (Intent::FinesOverdue, r"\blate\s+(?:returns?|fees?|books?)\b"),
    (Intent::FinesOverdue, r"\boutstanding\b"),
    (Intent::FinesOverdue, r"\bdues\b"),
    // Reservations
    (Intent::ReservationStatus, r"\breserv\w*"),
    (Intent::ReservationStatus, r"\bon\s+hold\b"),
    (Intent::ReservationStatus, r"\bholds?\b"),
    (Intent::ReservationStatus, r"\bwait(?:ing)?\s*list\b"),
    // Transactions
    (
        Intent::TransactionHistory,
        r"\bwho\s+(?:has\s+|have\s+)?(?:borrowed|issued|checked\s+out|has|took)\b",
    ),
    (
        Intent::TransactionHistory,
        r"\b(?:borrowed|issued|checked\s+out|loaned|lent)\b",
    ),
    (Intent::TransactionHistory, r"\btransactions?\b"),
    (Intent::TransactionHistory, r"\b(?:borrowing|loan|lending)\s+history\b"),
    (Intent::TransactionHistory, r"\bloans?\b"),
    // Members
    (Intent::MemberInfo, r"\bmembers?\b"),
    (Intent::MemberInfo, r"\bmembership\b"),
    (Intent::MemberInfo, r"\buser\s+(?:info|information|details|profile)\b"),
    (Intent::MemberInfo, r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"),
    // Availability
    (Intent::AvailabilityCheck, r"\bavailab\w*"),
    (Intent::AvailabilityCheck, r"\bin\s+stock\b"),
    (Intent::AvailabilityCheck, r"\bcopies\b"),
    (Intent::AvailabilityCheck, r"\bcan\s+i\s+(?:get|borrow|check\s+out)\b"),
    // Catalog search
    (Intent::BookSearch, r"\bbooks?\b"),
    (Intent::BookSearch, r"\btitles?\b"),
    (Intent::BookSearch, r"\bnovels?\b"),
    (Intent::BookSearch, r"\bauthors?\b"),
    (Intent::BookSearch, r"\bisbn\b"),
    (Intent::BookSearch, r"\bwritten\s+by\b"),
    (
        Intent::BookSearch,
        r"\b(?:find|search|looking\s+for|do\s+you\s+have|is\s+there)\b",
    ),
    (Intent::BookSearch, r"\bi\s+(?:want|need|would\s+like)\b"),
];

static COMPILED_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    INTENT_PATTERNS
        .iter()
        .map(|(intent, pattern)| (*intent, Regex::new(pattern).unwrap()))
        .collect()
});

/// Classify an utterance. Never fails; unmatched input is `Unknown`.
pub fn classify(utterance: &str) -> Intent {
    let lowered = utterance.to_lowercase();

    COMPILED_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&lowered))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(COMPILED_PATTERNS.len(), INTENT_PATTERNS.len());
    }

    #[test]
    fn table_never_maps_to_unknown() {
        assert!(INTENT_PATTERNS.iter().all(|(i, _)| *i != Intent::Unknown));
    }

    #[test]
    fn plain_title_request_is_book_search() {
        assert_eq!(
            classify("I want Harry Potter and the Goblet of Fire"),
            Intent::BookSearch
        );
        assert_eq!(classify("Find books by J.K. Rowling"), Intent::BookSearch);
        assert_eq!(classify("Search for Python programming books"), Intent::BookSearch);
    }

    #[test]
    fn overdue_beats_book_search() {
        assert_eq!(classify("Show overdue books"), Intent::FinesOverdue);
        assert_eq!(classify("Which books have late returns?"), Intent::FinesOverdue);
        assert_eq!(classify("Any fines for jane@example.com?"), Intent::FinesOverdue);
    }

    #[test]
    fn email_alone_implies_member_info() {
        assert_eq!(classify("Member info for john@email.com"), Intent::MemberInfo);
        assert_eq!(classify("john@email.com"), Intent::MemberInfo);
    }

    #[test]
    fn transactions_beat_members_and_books() {
        assert_eq!(classify("Who borrowed Harry Potter?"), Intent::TransactionHistory);
        assert_eq!(classify("Which member has issued the book Dune"), Intent::TransactionHistory);
        assert_eq!(classify("Show transaction history"), Intent::TransactionHistory);
        assert_eq!(classify("Loans for member John Smith"), Intent::TransactionHistory);
    }

    #[test]
    fn reservation_phrases() {
        assert_eq!(classify("Show pending reservations"), Intent::ReservationStatus);
        assert_eq!(classify("Is anyone on the waiting list for Dune?"), Intent::ReservationStatus);
        assert_eq!(classify("Put a hold on this book"), Intent::ReservationStatus);
    }

    #[test]
    fn availability_phrases() {
        assert_eq!(
            classify("Is The C Programming Language available?"),
            Intent::AvailabilityCheck
        );
        assert_eq!(classify("How many copies of Dune are there"), Intent::AvailabilityCheck);
    }

    #[test]
    fn word_boundaries_are_respected() {
        // "fire" is not "fine", "coffee" is not "fee"
        assert_eq!(classify("The Goblet of Fire"), Intent::Unknown);
        assert_eq!(classify("coffee table"), Intent::Unknown);
    }

    #[test]
    fn gibberish_and_empty_are_unknown() {
        assert_eq!(classify("xyzzy plugh"), Intent::Unknown);
        assert_eq!(classify(""), Intent::Unknown);
        assert_eq!(classify("   "), Intent::Unknown);
    }

    #[test]
    fn tags_are_snake_case() {
        assert_eq!(Intent::FinesOverdue.to_string(), "fines_overdue");
        assert_eq!(
            serde_json::to_string(&Intent::AvailabilityCheck).unwrap(),
            "\"availability_check\""
        );
    }
}
