//! Core traits for rumi storage abstractions.
//!
//! These traits define the storage port that both persistence backends
//! satisfy, so the access layer never depends on a concrete engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE STORE TRAITS
// =============================================================================

/// Storage port for note CRUD and filtered lookups.
///
/// Implementations own record storage outright; callers hold no copies
/// between calls. Every method is a single round trip to the engine.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Short backend label used in logs ("sql", "collection").
    fn backend(&self) -> &'static str;

    /// List every note.
    async fn list(&self, order: NoteOrder) -> Result<Vec<Note>>;

    /// Fetch a note by id. Returns `NoteNotFound` if it does not exist.
    async fn fetch(&self, id: &NoteId) -> Result<Note>;

    /// Insert a new note; the engine assigns the id and both timestamps.
    async fn insert(&self, draft: NoteDraft) -> Result<Note>;

    /// Overwrite title, content and date and refresh `updated_at`.
    /// Returns `NoteNotFound` if the id does not exist.
    async fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<Note>;

    /// Permanently delete a note. Returns `NoteNotFound` if it does not exist.
    async fn delete(&self, id: &NoteId) -> Result<()>;

    /// List notes matching a filter.
    async fn find(&self, filter: &NoteFilter, order: NoteOrder) -> Result<Vec<Note>>;
}

// =============================================================================
// SCHEMA TRAITS
// =============================================================================

/// Ensures the notes container and its fields exist.
#[async_trait]
pub trait SchemaReconciler: Send + Sync {
    /// Create the container if missing and add any missing fields.
    ///
    /// Existing fields are never redefined or removed, so this is safe to run
    /// on every startup.
    async fn ensure_schema(&self) -> Result<SchemaReport>;
}
