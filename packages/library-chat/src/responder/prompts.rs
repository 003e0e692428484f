//! Prompt for phrasing an answer from retrieved catalog rows.

use chrono::NaiveDate;

use crate::query::{Intent, Table};
use crate::store::records::{self, BookRecord, MemberRecord, ReservationRecord, TransactionRecord};
use crate::store::{Retrieval, Row};

/// Primary records shown to the model per turn.
pub const MAX_PROMPT_RECORDS: usize = 5;

pub const ANSWER_PROMPT: &str = r#"You are a helpful library management assistant.

User asked: "{question}"
Query type identified: {intent}

Database results:
{results}

Please provide a helpful, detailed response to the user's question based on this library data.
Be specific about book availability, member information, loans, fines, or whatever the user asked about.
If no data was found, say so and suggest alternative searches or actions.

IMPORTANT: Answer in clean, readable plain text without any markdown formatting.
Do not use asterisks (*), hashtags (#), or other markdown symbols.
- Use line breaks for readability
- Write "Book Title:" rather than "**Book Title:**"
- Use dashes (-) for lists
- Keep the tone natural and conversational"#;

const NO_RESULTS: &str = "No matching records were found in the library database for this question.";

const LOOKUP_FAILED: &str =
    "The library database could not be reached for this question, so no records are available.";

/// Format the answer prompt. Pure: the same inputs give the same prompt.
pub fn format_answer_prompt(
    question: &str,
    intent: Intent,
    retrieval: &Retrieval,
    today: NaiveDate,
) -> String {
    let results = match retrieval {
        Retrieval::Found {
            table,
            rows,
            related,
        } => {
            let mut text = format!("Primary data found ({} records from {}):\n", rows.len(), table);
            for (i, row) in rows.iter().take(MAX_PROMPT_RECORDS).enumerate() {
                text.push_str(&format!("{}. {}\n", i + 1, render_row(*table, row, today)));
            }
            if rows.len() > MAX_PROMPT_RECORDS {
                text.push_str(&format!(
                    "... and {} more records\n",
                    rows.len() - MAX_PROMPT_RECORDS
                ));
            }

            if !related.is_empty() {
                text.push_str("\nRelated data:\n");
                for set in related {
                    text.push_str(&format!("{}: {} records\n", set.label, set.rows.len()));
                    if let Some(sample) = set.rows.first() {
                        text.push_str(&format!(
                            "Sample: {}\n",
                            render_row(set.table, sample, today)
                        ));
                    }
                }
            }
            text
        }
        Retrieval::Empty { .. } => NO_RESULTS.to_string(),
        Retrieval::Failed { .. } => LOOKUP_FAILED.to_string(),
    };

    ANSWER_PROMPT
        .replace("{intent}", intent.as_str())
        .replace("{results}", results.trim_end())
        .replace("{question}", question.trim())
}

/// Render one row as a typed record, or as compact JSON when the row does
/// not fit the table's view.
pub fn render_row(table: Table, row: &Row, today: NaiveDate) -> String {
    let typed = match table {
        Table::Books => records::decode::<BookRecord>(row).map(|r| r.to_string()),
        Table::Members => records::decode::<MemberRecord>(row).map(|r| r.to_string()),
        Table::Transactions => {
            records::decode::<TransactionRecord>(row).map(|r| r.describe(today))
        }
        Table::Reservations => records::decode::<ReservationRecord>(row).map(|r| r.to_string()),
        Table::Staff => None,
    };

    match typed {
        Some(text) if !text.is_empty() => text,
        _ => serde_json::to_string(row).unwrap_or_default(),
    }
}
