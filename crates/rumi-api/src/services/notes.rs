//! Notes access layer.
//!
//! Each operation validates its input, makes exactly one call to the storage
//! port and returns the result unchanged.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use rumi_core::{
    parse_note_date, Error, Note, NoteDraft, NoteFilter, NoteId, NoteOrder, NoteStore, Result,
};

/// Request body for create and update. Every field is optional at the wire
/// level so that missing values become validation errors rather than
/// deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
}

fn parse_id(raw: &str) -> Result<NoteId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidInput("Invalid note ID".to_string()));
    }
    Ok(NoteId::from(raw))
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value.ok_or_else(|| Error::InvalidInput(message.to_string()))
}

#[derive(Clone)]
pub struct NotesService {
    store: Arc<dyn NoteStore>,
}

impl NotesService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Every note, newest date first.
    pub async fn list_all(&self) -> Result<Vec<Note>> {
        self.store.list(NoteOrder::DateDesc).await
    }

    pub async fn get(&self, id: &str) -> Result<Note> {
        let id = parse_id(id)?;
        self.store.fetch(&id).await
    }

    /// Create a note. A missing or blank date defaults to today (UTC).
    pub async fn create(&self, input: NoteInput) -> Result<Note> {
        let title = required(input.title, "Title is required")?;
        let content = required(input.content, "Content is required")?;
        let date = match input.date.as_deref().map(str::trim) {
            None | Some("") => Utc::now().date_naive(),
            Some(raw) => parse_note_date(raw)?,
        };

        let note = self
            .store
            .insert(NoteDraft::new(title, content, date)?)
            .await?;
        debug!(
            component = "notes_service",
            op = "create",
            backend = self.store.backend(),
            note_id = %note.id,
            "Note created"
        );
        Ok(note)
    }

    /// Replace title, content and date of an existing note. All three are
    /// required.
    pub async fn update(&self, id: &str, input: NoteInput) -> Result<Note> {
        let id = parse_id(id)?;
        let title = required(input.title, "Title is required")?;
        let content = required(input.content, "Content is required")?;
        let date = parse_note_date(&required(input.date, "Date is required")?)?;

        self.store
            .update(&id, NoteDraft::new(title, content, date)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        self.store.delete(&id).await?;
        debug!(
            component = "notes_service",
            op = "delete",
            backend = self.store.backend(),
            note_id = %id,
            "Note deleted"
        );
        Ok(())
    }

    /// Notes dated on `date` (`YYYY-MM-DD`), most recently created first.
    pub async fn get_by_date(&self, date: &str) -> Result<Vec<Note>> {
        let date = parse_note_date(date)?;
        self.store
            .find(&NoteFilter::OnDate(date), NoteOrder::CreatedDesc)
            .await
    }

    /// Notes whose title or content contains `query`, newest date first.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<Note>> {
        let query = match query {
            Some(q) if !q.is_empty() => q,
            _ => return Err(Error::InvalidInput("Search query is required".to_string())),
        };
        self.store
            .find(
                &NoteFilter::TextContains(query.to_string()),
                NoteOrder::DateDesc,
            )
            .await
    }
}
