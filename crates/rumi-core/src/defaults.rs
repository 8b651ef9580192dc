//! Centralized default constants for the rumi notes backend.
//!
//! Storage backends, the access layer, and the server configuration all
//! reference these instead of defining their own magic numbers.

// =============================================================================
// NOTES SCHEMA
// =============================================================================

/// Name of the record container (SQL table or collection) holding notes.
pub const NOTES_CONTAINER: &str = "notes";

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Maximum content length in characters.
pub const CONTENT_MAX_CHARS: usize = 100_000;

/// Wire and storage format for note dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8080;

/// Default request body cap in bytes (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// STORAGE
// =============================================================================

/// Default SQL backend connection URL.
pub const DATABASE_URL: &str = "sqlite://notes.db";

/// Default collection store document path.
pub const COLLECTION_DATA_PATH: &str = "rumi_data/collections.json";

/// Default maximum number of pooled SQL connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;
