//! Managed record-collection backend.
//!
//! Records live in named collections whose field definitions are stored
//! alongside them. Lookups use a small filter language (`field ~ 'text'`,
//! `&&`, `||`) and comma-separated sort keys (`-date,title`).

pub mod filter;
pub mod notes;
pub mod reconcile;
pub mod schema;
pub mod store;

pub use filter::{escape_filter_literal, parse_filter, parse_sort, FilterExpr, SortKey};
pub use notes::CollectionNoteStore;
pub use reconcile::{notes_fields, CollectionSchemaReconciler};
pub use schema::{CollectionSchema, Field, FieldKind};
pub use store::{CollectionStore, Record};
