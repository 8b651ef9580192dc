//! Note store over the record-collection backend.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::debug;

use rumi_core::{
    defaults::{DATE_FORMAT, NOTES_CONTAINER},
    Error, Note, NoteDraft, NoteFilter, NoteId, NoteOrder, NoteStore, Result,
};

use super::filter::escape_filter_literal;
use super::schema::parse_datetime;
use super::store::{CollectionStore, Record};

/// NoteStore backed by the `notes` collection.
#[derive(Clone)]
pub struct CollectionNoteStore {
    store: Arc<CollectionStore>,
}

impl CollectionNoteStore {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }
}

fn sort_expression(order: NoteOrder) -> &'static str {
    match order {
        NoteOrder::DateDesc => "-date",
        NoteOrder::CreatedDesc => "-created",
    }
}

/// Build the collection filter for a note lookup. User text only ever
/// appears inside an escaped quoted literal.
fn filter_expression(filter: &NoteFilter) -> String {
    match filter {
        NoteFilter::OnDate(date) => format!("date ~ '{}'", date.format(DATE_FORMAT)),
        NoteFilter::TextContains(term) => {
            let term = escape_filter_literal(term);
            format!("title ~ '{0}' || content ~ '{0}'", term)
        }
    }
}

fn draft_fields(draft: &NoteDraft) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("title".to_string(), Value::from(draft.title()));
    fields.insert("content".to_string(), Value::from(draft.content()));
    fields.insert(
        "date".to_string(),
        Value::from(draft.date().format(DATE_FORMAT).to_string()),
    );
    fields
}

fn record_to_note(record: Record) -> Result<Note> {
    let date_text = record.get_str("date").unwrap_or_default();
    let date = date_text
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, DATE_FORMAT).ok())
        .ok_or_else(|| {
            Error::Storage(format!(
                "note {} has malformed date '{}'",
                record.id, date_text
            ))
        })?;

    Ok(Note {
        title: record.get_str("title").unwrap_or_default().to_string(),
        content: record.get_str("content").unwrap_or_default().to_string(),
        date,
        created_at: record.get_str("created").and_then(parse_datetime),
        updated_at: record.get_str("updated").and_then(parse_datetime),
        id: NoteId::new(record.id),
    })
}

fn records_to_notes(records: Vec<Record>) -> Result<Vec<Note>> {
    records.into_iter().map(record_to_note).collect()
}

/// Translate a missing record into the note-level error.
fn note_not_found(id: &NoteId) -> impl FnOnce(Error) -> Error + '_ {
    move |e| match e {
        Error::NotFound(_) => Error::NoteNotFound(id.clone()),
        other => other,
    }
}

#[async_trait]
impl NoteStore for CollectionNoteStore {
    fn backend(&self) -> &'static str {
        "collection"
    }

    async fn list(&self, order: NoteOrder) -> Result<Vec<Note>> {
        let start = Instant::now();
        let records = self
            .store
            .find_records(NOTES_CONTAINER, "", sort_expression(order))
            .await?;
        let notes = records_to_notes(records)?;

        debug!(
            subsystem = "collection",
            component = "notes",
            op = "list",
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(notes)
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note> {
        let record = self
            .store
            .get_record(NOTES_CONTAINER, id.as_str())
            .await
            .map_err(note_not_found(id))?;
        record_to_note(record)
    }

    async fn insert(&self, draft: NoteDraft) -> Result<Note> {
        let record = self
            .store
            .create_record(NOTES_CONTAINER, draft_fields(&draft))
            .await?;
        let note = record_to_note(record)?;

        debug!(
            subsystem = "collection",
            component = "notes",
            op = "insert",
            note_id = %note.id,
            "Inserted note"
        );
        Ok(note)
    }

    async fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<Note> {
        let record = self
            .store
            .update_record(NOTES_CONTAINER, id.as_str(), draft_fields(&draft))
            .await
            .map_err(note_not_found(id))?;
        record_to_note(record)
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.store
            .delete_record(NOTES_CONTAINER, id.as_str())
            .await
            .map_err(note_not_found(id))
    }

    async fn find(&self, filter: &NoteFilter, order: NoteOrder) -> Result<Vec<Note>> {
        let start = Instant::now();
        let records = self
            .store
            .find_records(
                NOTES_CONTAINER,
                &filter_expression(filter),
                sort_expression(order),
            )
            .await?;
        let notes = records_to_notes(records)?;

        debug!(
            subsystem = "collection",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::filter::parse_filter;
    use crate::collection::reconcile::CollectionSchemaReconciler;
    use crate::collection::schema::{CollectionSchema, Field};
    use rumi_core::SchemaReconciler;
    use serde_json::json;

    #[test]
    fn test_date_filter_expression() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            filter_expression(&NoteFilter::OnDate(day)),
            "date ~ '2024-01-05'"
        );
    }

    #[test]
    fn test_text_filter_escapes_quotes() {
        let expr = filter_expression(&NoteFilter::TextContains("' || id != '".to_string()));
        let parsed = parse_filter(&expr).unwrap().unwrap();

        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("plain"));
        fields.insert("content".to_string(), json!("text"));
        assert!(!parsed.matches(&Record::new("rec000000000001", fields)));
    }

    #[test]
    fn test_record_to_note_reads_storage_formats() {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("t"));
        fields.insert("content".to_string(), json!("c"));
        fields.insert("date".to_string(), json!("2024-02-03 00:00:00.000Z"));
        fields.insert("created".to_string(), json!("2024-02-03 10:00:00.250Z"));
        fields.insert("updated".to_string(), json!(""));

        let note = record_to_note(Record::new("abc123", fields)).unwrap();
        assert_eq!(note.id.as_str(), "abc123");
        assert_eq!(note.date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert!(note.created_at.is_some());
        assert!(note.updated_at.is_none());
    }

    #[test]
    fn test_record_with_bad_date_is_storage_error() {
        let mut fields = Map::new();
        fields.insert("date".to_string(), json!("soon"));
        assert!(matches!(
            record_to_note(Record::new("abc", fields)),
            Err(Error::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_stricter_legacy_field_rejects_as_invalid_input() {
        let store = Arc::new(CollectionStore::in_memory());
        let mut legacy = CollectionSchema::new(NOTES_CONTAINER);
        legacy.add_field(Field::text("title", true, 5));
        store.save_collection(legacy).await.unwrap();
        CollectionSchemaReconciler::new(store.clone())
            .ensure_schema()
            .await
            .unwrap();

        let notes = CollectionNoteStore::new(store);
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let draft = NoteDraft::new("A longer title", "body", day).unwrap();

        let err = notes.insert(draft).await.unwrap_err();
        assert!(
            matches!(err, Error::InvalidInput(ref m) if m.contains("title")),
            "{:?}",
            err
        );
        assert!(notes.list(NoteOrder::default()).await.unwrap().is_empty());
    }
}
