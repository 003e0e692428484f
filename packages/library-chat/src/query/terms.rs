//! Search-term extraction.
//!
//! Shape-based fields (identifier, email, isbn) are pulled out for every
//! intent. Textual fields (author, member name, title) come from spans that
//! follow trigger phrases, and for catalog-style intents from whatever
//! significant text is left once every other span and the request phrasing
//! have been stripped.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use super::intent::Intent;

/// What an identifier refers to, when the utterance says so
/// ("book ID 12", "member 3f2504e0-...").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierOf {
    Book,
    Member,
}

/// Field values pulled out of an utterance. All fields absent is a valid
/// "no filter" result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchTerms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Owner of `identifier`; `None` when the utterance does not say
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_of: Option<IdentifierOf>,
    /// Fines question with no overdue or late wording
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub outstanding_fines: bool,
}

impl SearchTerms {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Present fields in vocabulary order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
            ("email", &self.email),
            ("member_name", &self.member_name),
            ("identifier", &self.identifier),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// The same terms with a lone title read as a member name, or a lone
    /// member name read as a title.
    ///
    /// "Loans for Dune" and "Loans for John Smith" have the same shape; when
    /// one reading finds nothing the other is worth a try.
    pub fn swapped_name_reading(&self) -> Option<SearchTerms> {
        if self.identifier.is_some()
            || self.email.is_some()
            || self.isbn.is_some()
            || self.author.is_some()
        {
            return None;
        }
        match (&self.title, &self.member_name) {
            (Some(title), None) => Some(SearchTerms {
                title: None,
                member_name: Some(title.clone()),
                ..self.clone()
            }),
            (None, Some(name)) => Some(SearchTerms {
                title: Some(name.clone()),
                member_name: None,
                ..self.clone()
            }),
            _ => None,
        }
    }
}

impl fmt::Display for SearchTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields()
            .into_iter()
            .map(|(name, value)| format!("{}: {:?}", name, value))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b").unwrap()
});
static EXPLICIT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bid\b\s*(?:[:#=]\s*|no\.?\s*|number\s*)?([a-z0-9][a-z0-9_-]*)").unwrap()
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});
static ID_OWNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(books?|members?|users?|patrons?|borrowers?)(?:'s)?\s*(?:#|no\.?|number)?\s*$")
        .unwrap()
});
static ISBN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bisbn\s*[:#]?\s*([0-9][0-9-]*[0-9xX])").unwrap());
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|“([^”]+)”|(?:^|\s)'([^']+)'"#).unwrap());
static QUOTED_AT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?:"([^"]+)"|“([^”]+)”|'([^']+)')"#).unwrap());
static AUTHOR_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:written\s+by|by)\s+").unwrap());
static TITLE_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:called|named|titled)\s+").unwrap());
static NAMED_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:named|called)\s+").unwrap());
static MEMBER_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:members?|users?|patrons?|borrowers?)\s+(?:named\s+|called\s+)?").unwrap()
});
// Case-sensitive so that a capitalised "For" inside a title is left alone.
static FOR_TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfor\s+").unwrap());
static CAPITALIZED_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][\w.'’-]*(?:\s+[A-Z][\w.'’-]*)*").unwrap());
static INITIALS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[A-Z]\.)+$").unwrap());
static CLAUSE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?!,;]").unwrap());
static LEADING_FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\s*(?:please|hey|hi|hello|can\s+you|could\s+you|can\s+i|could\s+i|i\s+want(?:\s+to)?|i\s+need(?:\s+to)?|i\s+would\s+like(?:\s+to)?|i'?d\s+like(?:\s+to)?|i\s+am\s+looking\s+for|i'?m\s+looking\s+for|looking\s+for|do\s+you\s+have|is\s+there|are\s+there|tell\s+me\s+about|show\s+me|show|find\s+me|find|search\s+for|search|get\s+me|get|give\s+me|list|check\s+if|check|borrow|read|who\s+(?:has\s+|have\s+)?(?:borrowed|issued|checked\s+out|has|took)|which\s+members?\s+(?:has\s+|have\s+)?(?:borrowed|issued|checked\s+out)|is|are|was|has|have|does|did|any|all|the\s+book|a\s+book|the\s+novel|a\s+novel|books?|titles?|novels?|called|named|titled|about|on|of|copies\s+of|how\s+many(?:\s+copies)?(?:\s+of)?|availability\s+of)(?:\s+|$|[,:]))+",
    )
    .unwrap()
});
// Request vocabulary of the loan and reservation intents; never part of a title.
static INTENT_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:put|place)\s+(?:a\s+)?holds?\s+on|(?:on|off)\s+hold(?:\s+(?:for|of))?|holds?\s+(?:on|for)|(?:on\s+)?(?:the\s+|a\s+)?wait(?:ing)?[\s-]*list(?:\s+(?:for|of))?|reserv\w*(?:\s+(?:status|requests?|queue))?(?:\s+(?:for|of|on))?|status\s+(?:of|for|on)|anyone|(?:borrowing|loan|lending|checkout|transaction)\s+history(?:\s+(?:for|of|on))?|(?:transactions?|loans?)\s+(?:for|of|on))\b",
    )
    .unwrap()
});
static FINES_WORDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:fines?|fees?|dues|outstanding|balance|owes?|owed|unpaid|penalt(?:y|ies))\b")
        .unwrap()
});
static OVERDUE_WORDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:overdue|late)\b").unwrap());
static TRAILING_FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\s+(?:books?|titles?|novels?|please|now|today|right\s+now|available|in\s+stock|in\s+the\s+library|at\s+the\s+library|copies|been|(?:are|is)\s+there)|\s*[?.!,;:]+)+\s*$",
    )
    .unwrap()
});

/// Words that never make a title or name on their own.
const STOPWORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "are", "book", "books", "borrowed", "by", "check", "copies",
    "copy", "current", "currently", "details", "find", "for", "get", "has", "have", "history",
    "i", "in", "info", "information", "is", "issued", "it", "library", "list", "loan", "loans",
    "me", "member", "members", "my", "need", "novel", "novels", "of", "on", "or", "pending",
    "please", "profile", "record", "records", "reservation", "reservations", "reserved",
    "search", "show", "some", "status", "that", "the", "there", "these", "this", "those",
    "title", "titles", "to", "transaction", "transactions", "want", "what", "which", "who",
    "with", "available", "availability", "stock", "now", "today", "right", "anyone",
    "overdue", "fine", "fines",
];

/// Extract search terms for an utterance already classified as `intent`.
///
/// Deterministic. When an identifier is found, textual fields are dropped
/// because an exact-id lookup is unambiguous.
pub fn extract(utterance: &str, intent: Intent) -> SearchTerms {
    let mut terms = SearchTerms::default();
    let mut consumed: Vec<Range<usize>> = Vec::new();

    extract_shapes(utterance, &mut terms, &mut consumed);

    if intent == Intent::Unknown {
        return terms;
    }

    if intent == Intent::FinesOverdue {
        terms.outstanding_fines =
            FINES_WORDING_RE.is_match(utterance) && !OVERDUE_WORDING_RE.is_match(utterance);
    }

    if intent.accepts_book_terms() {
        if let Some((author, range)) = author_span(utterance, &consumed) {
            terms.author = Some(author);
            consumed.push(range);
        }
    }

    if intent.is_member_centric() {
        if let Some((name, range)) = member_span(utterance, intent, &consumed) {
            terms.member_name = Some(name);
            consumed.push(range);
        }
    }

    if intent.accepts_book_terms() {
        let explicit = quoted_anywhere(utterance, &consumed)
            .or_else(|| triggered_span(utterance, &TITLE_TRIGGER_RE, &consumed, true));

        match explicit {
            Some((title, range)) => {
                terms.title = Some(title);
                consumed.push(range);
            }
            None if intent.reads_remainder_as_title() => {
                let mut blanked = consumed.clone();
                blanked.extend(INTENT_PHRASE_RE.find_iter(utterance).map(|m| m.range()));
                terms.title = title_from_remainder(&remainder(utterance, &blanked));
            }
            None => {}
        }
    }

    if terms.identifier.is_some() {
        terms.title = None;
        terms.author = None;
        terms.member_name = None;
    }

    terms
}

fn extract_shapes(utterance: &str, terms: &mut SearchTerms, consumed: &mut Vec<Range<usize>>) {
    // Emails first so an "id" in front of one does not capture its local part
    if let Some(m) = EMAIL_RE.find(utterance) {
        terms.email = Some(m.as_str().to_string());
        consumed.push(m.range());
    }

    let taken: &[Range<usize>] = consumed;
    let uuid = UUID_RE
        .find_iter(utterance)
        .find(|m| !overlaps(taken, &m.range()))
        .map(|m| (m.as_str().to_lowercase(), m.range()));
    let identifier = uuid.or_else(|| {
        EXPLICIT_ID_RE.captures_iter(utterance).find_map(|caps| {
            let whole = caps.get(0)?;
            let token = caps.get(1)?;
            let usable = token.as_str().chars().any(|ch| ch.is_ascii_digit())
                && !overlaps(taken, &whole.range());
            usable.then(|| (token.as_str().to_string(), whole.range()))
        })
    });

    if let Some((value, range)) = identifier {
        terms.identifier = Some(value);
        terms.identifier_of = identifier_owner(&utterance[..range.start]);
        consumed.push(range);
    }

    if let Some(caps) = ISBN_RE.captures(utterance) {
        terms.isbn = Some(caps[1].replace('-', "").to_uppercase());
        if let Some(whole) = caps.get(0) {
            consumed.push(whole.range());
        }
    }
}

/// Owner named right before an identifier: "book ID 12", "member #7".
fn identifier_owner(before: &str) -> Option<IdentifierOf> {
    let caps = ID_OWNER_RE.captures(before)?;
    let noun = caps.get(1)?.as_str().to_lowercase();
    if noun.starts_with("book") {
        Some(IdentifierOf::Book)
    } else {
        Some(IdentifierOf::Member)
    }
}

fn author_span(utterance: &str, consumed: &[Range<usize>]) -> Option<(String, Range<usize>)> {
    triggered_span(utterance, &AUTHOR_TRIGGER_RE, consumed, true)
}

fn member_span(
    utterance: &str,
    intent: Intent,
    consumed: &[Range<usize>],
) -> Option<(String, Range<usize>)> {
    if intent == Intent::MemberInfo {
        if let Some(found) = quoted_anywhere(utterance, consumed)
            .or_else(|| triggered_span(utterance, &NAMED_TRIGGER_RE, consumed, true))
        {
            return Some(found);
        }
    }

    let by_noun = triggered_span(utterance, &MEMBER_NOUN_RE, consumed, false);

    // Loans and reservations are as often "for" a book as for a person, so
    // there a bare "for <Name>" is left to the title reading.
    match intent {
        Intent::MemberInfo | Intent::FinesOverdue => {
            by_noun.or_else(|| capitalized_after(utterance, &FOR_TRIGGER_RE, consumed))
        }
        _ => by_noun,
    }
}

/// First span after `trigger` that yields a value. With `allow_clause`, an
/// uncapitalised rest-of-clause is accepted when no name-like span follows.
fn triggered_span(
    utterance: &str,
    trigger: &Regex,
    consumed: &[Range<usize>],
    allow_clause: bool,
) -> Option<(String, Range<usize>)> {
    trigger.find_iter(utterance).find_map(|m| {
        if overlaps(consumed, &m.range()) {
            return None;
        }
        let rest = &utterance[m.end()..];
        let (value, len) = quoted_at_start(rest)
            .or_else(|| capitalized_run(rest))
            .or_else(|| allow_clause.then(|| clause(rest)).flatten())?;
        let range = m.start()..m.end() + len;
        (!overlaps(consumed, &range)).then_some((value, range))
    })
}

fn capitalized_after(
    utterance: &str,
    trigger: &Regex,
    consumed: &[Range<usize>],
) -> Option<(String, Range<usize>)> {
    trigger.find_iter(utterance).find_map(|m| {
        let (value, len) = capitalized_run(&utterance[m.end()..])?;
        let range = m.start()..m.end() + len;
        (!overlaps(consumed, &range)).then_some((value, range))
    })
}

fn quoted_anywhere(utterance: &str, consumed: &[Range<usize>]) -> Option<(String, Range<usize>)> {
    QUOTED_RE.captures_iter(utterance).find_map(|caps| {
        let whole = caps.get(0)?;
        if overlaps(consumed, &whole.range()) {
            return None;
        }
        let inner = (1..=3).find_map(|i| caps.get(i))?;
        let value = collapse_whitespace(inner.as_str());
        is_significant(&value).then_some((value, whole.range()))
    })
}

fn quoted_at_start(rest: &str) -> Option<(String, usize)> {
    let caps = QUOTED_AT_START_RE.captures(rest)?;
    let whole = caps.get(0)?;
    let inner = (1..=3).find_map(|i| caps.get(i))?;
    let value = collapse_whitespace(inner.as_str());
    is_significant(&value).then_some((value, whole.end()))
}

fn capitalized_run(rest: &str) -> Option<(String, usize)> {
    let m = CAPITALIZED_RUN_RE.find(rest)?;
    let value = trim_sentence_end(m.as_str());
    let first = value.split_whitespace().next()?;
    if is_stopword(first) || !is_significant(&value) {
        return None;
    }
    Some((value, m.end()))
}

fn clause(rest: &str) -> Option<(String, usize)> {
    let end = CLAUSE_END_RE.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    let trimmed = TRAILING_FILLER_RE.replace(&rest[..end], "");
    let value = trim_sentence_end(&collapse_whitespace(&trimmed));
    is_significant(&value).then_some((value, end))
}

/// Utterance text with every consumed span blanked out.
fn remainder(utterance: &str, consumed: &[Range<usize>]) -> String {
    let mut ranges = consumed.to_vec();
    ranges.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(utterance.len());
    let mut last = 0;
    for r in ranges {
        if r.start > last {
            out.push_str(&utterance[last..r.start]);
        }
        out.push(' ');
        last = last.max(r.end);
    }
    if last < utterance.len() {
        out.push_str(&utterance[last..]);
    }
    out
}

fn title_from_remainder(text: &str) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    let without_lead = LEADING_FILLER_RE.replace(&collapsed, "");
    let without_tail = TRAILING_FILLER_RE.replace(&without_lead, "");
    let value = without_tail
        .trim()
        .trim_matches(|c: char| matches!(c, ',' | ':' | ';' | '-'))
        .trim()
        .to_string();

    is_significant(&value).then_some(value)
}

/// Drop sentence punctuation from the end, keeping the dot of a trailing
/// initial such as "J.K.".
fn trim_sentence_end(value: &str) -> String {
    let value = value.trim();
    let last_token = value.split_whitespace().last().unwrap_or("");
    if value.ends_with('.') && INITIALS_RE.is_match(last_token) {
        return value.to_string();
    }
    value
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
        .trim()
        .to_string()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_stopword(word: &str) -> bool {
    let word = word
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    STOPWORDS.contains(&word.as_str())
}

fn is_significant(value: &str) -> bool {
    value
        .split_whitespace()
        .any(|w| !is_stopword(w) && w.chars().any(char::is_alphanumeric))
}

fn overlaps(consumed: &[Range<usize>], range: &Range<usize>) -> bool {
    consumed
        .iter()
        .any(|r| r.start < range.end && range.start < r.end)
}
