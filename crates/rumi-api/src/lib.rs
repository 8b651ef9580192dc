//! rumi-api - HTTP API server for the rumi notes backend
//!
//! Routes live under `/api`: note CRUD, lookup by date, text search and a
//! health check. The storage backend is chosen at startup and reached only
//! through the `NoteStore` port.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod services;

pub use config::ServerConfig;
pub use error::ApiError;
pub use logging::{init_tracing, LogSettings};
pub use router::{build_router, MakeRequestUuidV7};
pub use services::{NoteInput, NotesService};

use rumi_db::Storage;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub notes: NotesService,
}

impl AppState {
    pub fn new(storage: &Storage) -> Self {
        Self {
            notes: NotesService::new(storage.notes.clone()),
        }
    }
}
