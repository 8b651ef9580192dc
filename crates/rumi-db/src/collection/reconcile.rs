//! Schema reconciliation for the `notes` collection.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use rumi_core::{
    defaults::{CONTENT_MAX_CHARS, NOTES_CONTAINER, TITLE_MAX_CHARS},
    Error, Result, SchemaReconciler, SchemaReport,
};

use super::schema::{CollectionSchema, Field};
use super::store::CollectionStore;

/// Field set the notes collection must carry.
pub fn notes_fields() -> Vec<Field> {
    vec![
        Field::text("title", true, TITLE_MAX_CHARS),
        Field::text("content", true, CONTENT_MAX_CHARS),
        Field::date("date", true),
        Field::autodate("created", true, false),
        Field::autodate("updated", true, true),
    ]
}

/// Ensures the `notes` collection exists with every expected field.
#[derive(Clone)]
pub struct CollectionSchemaReconciler {
    store: Arc<CollectionStore>,
}

impl CollectionSchemaReconciler {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SchemaReconciler for CollectionSchemaReconciler {
    async fn ensure_schema(&self) -> Result<SchemaReport> {
        let mut report = SchemaReport::default();

        let mut schema = match self.store.find_collection(NOTES_CONTAINER).await {
            Some(schema) => schema,
            None => {
                report.container_created = true;
                CollectionSchema::new(NOTES_CONTAINER)
            }
        };

        for field in notes_fields() {
            let name = field.name.clone();
            if schema.add_field(field) && !report.container_created {
                report.fields_added.push(name);
            }
        }

        if report.is_unchanged() {
            debug!(
                subsystem = "collection",
                component = "schema",
                op = "ensure_schema",
                "Notes collection already up to date"
            );
            return Ok(report);
        }

        self.store.save_collection(schema).await.map_err(|e| {
            Error::Schema(format!(
                "failed to save '{}' collection: {}",
                NOTES_CONTAINER, e
            ))
        })?;

        info!(
            subsystem = "collection",
            component = "schema",
            op = "ensure_schema",
            container_created = report.container_created,
            fields_added = ?report.fields_added,
            "Notes collection reconciled"
        );
        Ok(report)
    }
}
