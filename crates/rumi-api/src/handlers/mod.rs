//! HTTP handlers for rumi-api.

pub mod health;
pub mod notes;

pub use health::{health, not_found};
pub use notes::{
    create_note, delete_note, get_note, list_notes, notes_by_date, search_notes, update_note,
};
