//! Service layer for business logic.

pub mod notes;

pub use notes::{NoteInput, NotesService};
