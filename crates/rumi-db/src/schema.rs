//! Schema reconciliation for the SQL notes table.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use rumi_core::{defaults::NOTES_CONTAINER, Error, Result, SchemaReconciler, SchemaReport};

/// Column definition used both when creating the table and when adding a
/// column to an existing one.
struct ColumnSpec {
    name: &'static str,
    /// Definition inside `CREATE TABLE`.
    create: &'static str,
    /// Definition for `ALTER TABLE ... ADD COLUMN`. SQLite requires a default
    /// for NOT NULL columns added to a populated table.
    add: &'static str,
}

const NOTE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        name: "title",
        create: "title TEXT NOT NULL",
        add: "title TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        name: "content",
        create: "content TEXT NOT NULL",
        add: "content TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        name: "date",
        create: "date TEXT NOT NULL",
        add: "date TEXT NOT NULL DEFAULT '1970-01-01'",
    },
    ColumnSpec {
        name: "created_at",
        create: "created_at TEXT",
        add: "created_at TEXT",
    },
    ColumnSpec {
        name: "updated_at",
        create: "updated_at TEXT",
        add: "updated_at TEXT",
    },
];

/// Ensures the `notes` table and its columns exist.
#[derive(Clone)]
pub struct SqlSchemaReconciler {
    pool: SqlitePool,
}

impl SqlSchemaReconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(NOTES_CONTAINER)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count > 0)
    }

    async fn existing_columns(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", NOTES_CONTAINER))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Error::Database))
            .collect()
    }

    async fn create_table(&self) -> Result<()> {
        let columns: Vec<&str> = NOTE_COLUMNS.iter().map(|c| c.create).collect();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
            NOTES_CONTAINER,
            columns.join(", ")
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl SchemaReconciler for SqlSchemaReconciler {
    async fn ensure_schema(&self) -> Result<SchemaReport> {
        let mut report = SchemaReport::default();

        if !self.table_exists().await? {
            self.create_table().await?;
            report.container_created = true;
        } else {
            let existing = self.existing_columns().await?;
            for column in NOTE_COLUMNS {
                if existing.contains(column.name) {
                    continue;
                }
                sqlx::query(&format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    NOTES_CONTAINER, column.add
                ))
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
                report.fields_added.push(column.name.to_string());
            }
        }

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_date ON {0} (date)",
            NOTES_CONTAINER
        ))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if report.is_unchanged() {
            debug!(
                subsystem = "database",
                component = "schema",
                op = "ensure_schema",
                "Notes table already up to date"
            );
        } else {
            info!(
                subsystem = "database",
                component = "schema",
                op = "ensure_schema",
                container_created = report.container_created,
                fields_added = ?report.fields_added,
                "Notes table reconciled"
            );
        }

        Ok(report)
    }
}
