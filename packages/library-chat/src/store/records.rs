//! Typed, read-only views over store rows.
//!
//! Rows come back as loose JSON. These views pick out the columns the
//! prompt cares about; absent columns stay `None` and unknown ones are
//! ignored. Identifiers may be integers or UUID strings depending on the
//! schema, so they are normalized to strings.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

use supabase_client::Row;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_copies: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub available_copies: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemberRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    pub membership_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fine_balance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub return_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fine: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReservationRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub reservation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    pub reservation_date: Option<String>,
    pub status: Option<String>,
}

/// Decode a row into a typed view. `None` if a known column has a shape
/// the view cannot hold.
pub fn decode<T: for<'de> Deserialize<'de>>(row: &Row) -> Option<T> {
    serde_json::from_value(Value::Object(row.clone())).ok()
}

/// Whole days a book has been out: until `return_date` when returned,
/// otherwise until `today`. Accepts plain dates and RFC 3339 timestamps.
pub fn days_issued(issue_date: &str, return_date: Option<&str>, today: NaiveDate) -> Option<i64> {
    let issued = parse_date(issue_date)?;
    let end = match return_date {
        Some(raw) => parse_date(raw)?,
        None => today,
    };
    Some((end - issued).num_days())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl fmt::Display for BookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = Line::default();
        line.push("Title", self.title.as_deref());
        line.push("Author", self.author.as_deref());
        line.push("ISBN", self.isbn.as_deref());
        line.push("Publisher", self.publisher.as_deref());
        line.push("Genre", self.genre.as_deref());
        line.push_number("Available copies", self.available_copies);
        line.push_number("Total copies", self.total_copies);
        line.push("Book ID", self.book_id.as_deref());
        f.write_str(&line.finish())
    }
}

impl fmt::Display for MemberRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = Line::default();
        line.push("Name", self.full_name.as_deref());
        line.push("Email", self.email.as_deref());
        line.push("Phone", self.phone.as_deref());
        line.push("Membership", self.membership_type.as_deref());
        line.push_number("Fine balance", self.fine_balance);
        line.push("Member ID", self.member_id.as_deref());
        f.write_str(&line.finish())
    }
}

impl TransactionRecord {
    /// One-line description; includes days issued relative to `today`.
    pub fn describe(&self, today: NaiveDate) -> String {
        let days = self
            .issue_date
            .as_deref()
            .and_then(|issued| days_issued(issued, self.return_date.as_deref(), today));

        let mut line = Line::default();
        line.push("Transaction ID", self.transaction_id.as_deref());
        line.push("Book ID", self.book_id.as_deref());
        line.push("Member ID", self.member_id.as_deref());
        line.push("Issued", self.issue_date.as_deref());
        line.push("Due", self.due_date.as_deref());
        line.push(
            "Returned",
            Some(self.return_date.as_deref().unwrap_or("not yet returned")),
        );
        line.push("Days issued", days.map(|d| d.to_string()).as_deref());
        line.push_number("Fine", self.fine);
        line.finish()
    }
}

impl fmt::Display for ReservationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = Line::default();
        line.push("Reservation ID", self.reservation_id.as_deref());
        line.push("Book ID", self.book_id.as_deref());
        line.push("Member ID", self.member_id.as_deref());
        line.push("Reserved on", self.reservation_date.as_deref());
        line.push("Status", self.status.as_deref());
        f.write_str(&line.finish())
    }
}

#[derive(Default)]
struct Line {
    parts: Vec<String>,
}

impl Line {
    fn push(&mut self, label: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.parts.push(format!("{label}: {value}"));
        }
    }

    fn push_number(&mut self, label: &str, value: Option<f64>) {
        if let Some(value) = value {
            let rendered = if value.fract() == 0.0 {
                format!("{}", value as i64)
            } else {
                format!("{value:.2}")
            };
            self.parts.push(format!("{label}: {rendered}"));
        }
    }

    fn finish(self) -> String {
        self.parts.join(" | ")
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
