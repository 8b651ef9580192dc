//! Core data models for the rumi notes backend.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{CONTENT_MAX_CHARS, DATE_FORMAT, TITLE_MAX_CHARS};
use crate::error::{Error, Result};

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Identifier assigned to a note by the storage backend.
///
/// The SQL backend renders its integer row id in decimal; the collection
/// backend uses its generated record id verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A stored note as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Calendar date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated field values for creating or replacing a note.
///
/// Construction enforces the non-empty and length rules, so every backend
/// receives data it can store without further checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    title: String,
    content: String,
    date: NaiveDate,
}

impl NoteDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        date: NaiveDate,
    ) -> Result<Self> {
        let title = title.into();
        let content = content.into();

        if title.trim().is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(Error::InvalidInput(format!(
                "Title must be at most {} characters",
                TITLE_MAX_CHARS
            )));
        }
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("Content is required".to_string()));
        }
        if content.chars().count() > CONTENT_MAX_CHARS {
            return Err(Error::InvalidInput(format!(
                "Content must be at most {} characters",
                CONTENT_MAX_CHARS
            )));
        }

        Ok(Self {
            title,
            content,
            date,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_note_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidInput("Invalid date format. Use YYYY-MM-DD".to_string()))
}

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Record selection for filtered lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    /// Notes whose date falls on this calendar day.
    OnDate(NaiveDate),
    /// Notes whose title or content contains the term (case-sensitive).
    TextContains(String),
}

/// Result ordering for list and filter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteOrder {
    /// Newest date first.
    #[default]
    DateDesc,
    /// Most recently created first.
    CreatedDesc,
}

// =============================================================================
// SCHEMA TYPES
// =============================================================================

/// Outcome of a schema reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// Whether the notes container had to be created.
    pub container_created: bool,
    /// Fields added during this run, in definition order.
    pub fields_added: Vec<String>,
}

impl SchemaReport {
    /// True when the run found the schema already complete.
    pub fn is_unchanged(&self) -> bool {
        !self.container_created && self.fields_added.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_draft_accepts_valid_fields() {
        let draft = NoteDraft::new("Groceries", "milk, eggs", day(2024, 1, 1)).unwrap();
        assert_eq!(draft.title(), "Groceries");
        assert_eq!(draft.content(), "milk, eggs");
        assert_eq!(draft.date(), day(2024, 1, 1));
    }

    #[test]
    fn test_draft_rejects_blank_title() {
        let err = NoteDraft::new("   ", "body", day(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "Title is required"));
    }

    #[test]
    fn test_draft_rejects_empty_content() {
        let err = NoteDraft::new("title", "", day(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "Content is required"));
    }

    #[test]
    fn test_draft_title_limit_counts_characters() {
        let at_limit = "é".repeat(TITLE_MAX_CHARS);
        assert!(NoteDraft::new(at_limit, "body", day(2024, 1, 1)).is_ok());

        let over = "a".repeat(TITLE_MAX_CHARS + 1);
        assert!(matches!(
            NoteDraft::new(over, "body", day(2024, 1, 1)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_draft_content_limit() {
        let over = "x".repeat(CONTENT_MAX_CHARS + 1);
        assert!(matches!(
            NoteDraft::new("title", over, day(2024, 1, 1)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_note_date() {
        assert_eq!(parse_note_date("2024-01-02").unwrap(), day(2024, 1, 2));
        assert_eq!(parse_note_date(" 2024-01-02 ").unwrap(), day(2024, 1, 2));
    }

    #[test]
    fn test_parse_note_date_rejects_impossible_date() {
        assert!(matches!(
            parse_note_date("2024-13-40"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(parse_note_date("01/02/2024"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_note_date(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_note_json_shape() {
        let note = Note {
            id: NoteId::from(7),
            title: "t".to_string(),
            content: "c".to_string(),
            date: day(2024, 3, 9),
            created_at: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["date"], "2024-03-09");
        assert!(json["created_at"].is_null());
        assert!(json["updated_at"].is_null());
    }

    #[test]
    fn test_note_timestamps_serialize_as_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-03-09T10:11:12Z")
            .unwrap()
            .with_timezone(&Utc);
        let note = Note {
            id: NoteId::from("abc"),
            title: "t".to_string(),
            content: "c".to_string(),
            date: day(2024, 3, 9),
            created_at: Some(ts),
            updated_at: Some(ts),
        };
        let json = serde_json::to_value(&note).unwrap();
        let created = json["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn test_schema_report_unchanged() {
        assert!(SchemaReport::default().is_unchanged());
        let report = SchemaReport {
            container_created: false,
            fields_added: vec!["date".to_string()],
        };
        assert!(!report.is_unchanged());
    }
}
