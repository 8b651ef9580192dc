//! SQL note store implementation.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use rumi_core::{
    defaults::DATE_FORMAT, Error, Note, NoteDraft, NoteFilter, NoteId, NoteOrder, NoteStore,
    Result,
};

/// Columns selected for every note query. The date is cut to its first ten
/// characters so rows written with a time component still read as a
/// calendar day.
const NOTE_COLUMNS: &str =
    "id, title, content, substr(date, 1, 10) AS date, created_at, updated_at";

/// SQLite implementation of NoteStore over the `notes` table.
#[derive(Clone)]
pub struct SqlNoteStore {
    pool: SqlitePool,
}

impl SqlNoteStore {
    /// Create a new SqlNoteStore with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Parse an API-facing id into the table's integer primary key.
fn parse_row_id(id: &NoteId) -> Result<i64> {
    id.as_str()
        .parse::<i64>()
        .map_err(|_| Error::InvalidInput("Invalid note ID".to_string()))
}

fn order_clause(order: NoteOrder) -> &'static str {
    match order {
        NoteOrder::DateDesc => "ORDER BY date DESC, id DESC",
        NoteOrder::CreatedDesc => "ORDER BY created_at DESC, id DESC",
    }
}

/// Map a database row to a Note.
fn map_row_to_note(row: SqliteRow) -> Result<Note> {
    let id: i64 = row.try_get("id")?;
    let date_text: String = row.try_get("date")?;
    let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|e| {
        Error::Storage(format!(
            "note {} has malformed date '{}': {}",
            id, date_text, e
        ))
    })?;

    Ok(Note {
        id: NoteId::from(id),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        date,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<Note>> {
    rows.into_iter().map(map_row_to_note).collect()
}

#[async_trait]
impl NoteStore for SqlNoteStore {
    fn backend(&self) -> &'static str {
        "sql"
    }

    async fn list(&self, order: NoteOrder) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = format!("SELECT {} FROM notes {}", NOTE_COLUMNS, order_clause(order));
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        let notes = map_rows(rows)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(notes)
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note> {
        let row_id = parse_row_id(id)?;
        let query = format!("SELECT {} FROM notes WHERE id = ?", NOTE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(row_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NoteNotFound(id.clone()))?;

        map_row_to_note(row)
    }

    async fn insert(&self, draft: NoteDraft) -> Result<Note> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO notes (title, content, date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {}",
            NOTE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(draft.title())
            .bind(draft.content())
            .bind(draft.date())
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let note = map_row_to_note(row)?;
        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = %note.id,
            "Inserted note"
        );
        Ok(note)
    }

    async fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<Note> {
        let row_id = parse_row_id(id)?;
        let query = format!(
            "UPDATE notes SET title = ?, content = ?, date = ?, updated_at = ?
             WHERE id = ?
             RETURNING {}",
            NOTE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(draft.title())
            .bind(draft.content())
            .bind(draft.date())
            .bind(Utc::now())
            .bind(row_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NoteNotFound(id.clone()))?;

        map_row_to_note(row)
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        let row_id = parse_row_id(id)?;
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(row_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id.clone()));
        }
        Ok(())
    }

    async fn find(&self, filter: &NoteFilter, order: NoteOrder) -> Result<Vec<Note>> {
        let start = Instant::now();
        let rows = match filter {
            NoteFilter::OnDate(date) => {
                let query = format!(
                    "SELECT {} FROM notes WHERE substr(date, 1, 10) = ? {}",
                    NOTE_COLUMNS,
                    order_clause(order)
                );
                sqlx::query(&query)
                    .bind(date.format(DATE_FORMAT).to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            NoteFilter::TextContains(term) => {
                // instr() is case-sensitive and treats the term literally,
                // unlike LIKE.
                let query = format!(
                    "SELECT {} FROM notes WHERE instr(title, ?) > 0 OR instr(content, ?) > 0 {}",
                    NOTE_COLUMNS,
                    order_clause(order)
                );
                sqlx::query(&query)
                    .bind(term.as_str())
                    .bind(term.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(Error::Database)?;
        let notes = map_rows(rows)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "find",
            filter = ?filter,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Filtered notes"
        );
        Ok(notes)
    }
}
