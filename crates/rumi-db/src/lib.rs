//! # rumi-db
//!
//! Storage backends for the rumi notes backend.
//!
//! This crate provides:
//! - SQLite connection pool management
//! - `SqlNoteStore` and `SqlSchemaReconciler` over a raw `notes` table
//! - A managed record-collection store with its own filter language
//! - `CollectionNoteStore` and `CollectionSchemaReconciler` over that store
//! - `Storage`, which picks a backend at startup
//!
//! ## Example
//!
//! ```rust,ignore
//! use rumi_db::{Storage, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Storage::open(&StorageConfig::default()).await?;
//!     storage.schema.ensure_schema().await?;
//!
//!     let notes = storage.notes.list(Default::default()).await?;
//!     println!("{} notes", notes.len());
//!     Ok(())
//! }
//! ```
pub mod collection;
pub mod notes;
pub mod pool;
pub mod schema;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

// Re-export core types
pub use rumi_core::*;

pub use collection::{CollectionNoteStore, CollectionSchemaReconciler, CollectionStore};
pub use notes::SqlNoteStore;
pub use pool::{create_memory_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use schema::SqlSchemaReconciler;

/// Which persistence engine backs the notes API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Raw SQL table.
    #[default]
    Sql,
    /// Managed record collection.
    Collection,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" | "sqlite" => Ok(Self::Sql),
            "collection" | "collections" => Ok(Self::Collection),
            other => Err(Error::Config(format!(
                "unknown storage backend '{}', expected 'sql' or 'collection'",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql => f.write_str("sql"),
            Self::Collection => f.write_str("collection"),
        }
    }
}

/// Settings needed to open either backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    /// File backing the collection store. `None` keeps it in memory.
    pub collection_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            collection_path: Some(PathBuf::from(defaults::COLLECTION_DATA_PATH)),
        }
    }
}

/// The storage port and its schema reconciler for one backend.
#[derive(Clone)]
pub struct Storage {
    pub backend: StorageBackend,
    pub notes: Arc<dyn NoteStore>,
    pub schema: Arc<dyn SchemaReconciler>,
}

impl Storage {
    /// SQL backend over an existing pool.
    pub fn sql(pool: sqlx::SqlitePool) -> Self {
        Self {
            backend: StorageBackend::Sql,
            notes: Arc::new(SqlNoteStore::new(pool.clone())),
            schema: Arc::new(SqlSchemaReconciler::new(pool)),
        }
    }

    /// Collection backend over an opened store.
    pub fn collection(store: Arc<CollectionStore>) -> Self {
        Self {
            backend: StorageBackend::Collection,
            notes: Arc::new(CollectionNoteStore::new(store.clone())),
            schema: Arc::new(CollectionSchemaReconciler::new(store)),
        }
    }

    /// Open the backend named in `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let storage = match config.backend {
            StorageBackend::Sql => {
                let pool = create_pool_with_config(
                    &config.database_url,
                    PoolConfig::for_url(&config.database_url, config.max_connections),
                )
                .await?;
                log_pool_metrics(&pool);
                Self::sql(pool)
            }
            StorageBackend::Collection => {
                let store = match &config.collection_path {
                    Some(path) => CollectionStore::open(path.clone()).await?,
                    None => CollectionStore::in_memory(),
                };
                Self::collection(Arc::new(store))
            }
        };

        info!(
            subsystem = "storage",
            op = "open",
            backend = %storage.backend,
            "Storage backend ready"
        );
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("sql".parse::<StorageBackend>().unwrap(), StorageBackend::Sql);
        assert_eq!(
            " Collection ".parse::<StorageBackend>().unwrap(),
            StorageBackend::Collection
        );
        assert!(matches!(
            "postgres".parse::<StorageBackend>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_backend_display_round_trips() {
        for backend in [StorageBackend::Sql, StorageBackend::Collection] {
            assert_eq!(backend.to_string().parse::<StorageBackend>().unwrap(), backend);
        }
    }

    #[tokio::test]
    async fn test_open_in_memory_collection() {
        let config = StorageConfig {
            backend: StorageBackend::Collection,
            collection_path: None,
            ..StorageConfig::default()
        };
        let storage = Storage::open(&config).await.unwrap();
        assert_eq!(storage.notes.backend(), "collection");
        assert!(storage.schema.ensure_schema().await.unwrap().container_created);
    }

    #[tokio::test]
    async fn test_open_sql() {
        let config = StorageConfig {
            database_url: pool::MEMORY_DATABASE_URL.to_string(),
            max_connections: 10,
            ..StorageConfig::default()
        };
        let storage = Storage::open(&config).await.unwrap();
        assert_eq!(storage.notes.backend(), "sql");

        // Schema and data must land on the same in-memory database.
        storage.schema.ensure_schema().await.unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        storage
            .notes
            .insert(NoteDraft::new("t", "c", day).unwrap())
            .await
            .unwrap();
        assert_eq!(storage.notes.list(NoteOrder::DateDesc).await.unwrap().len(), 1);
    }
}
