//! Schema-bearing record store persisted as a single JSON document.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use rumi_core::{Error, Result};

use super::filter::{compare_records, parse_filter, parse_sort};
use super::schema::{format_datetime, normalize_date, CollectionSchema, FieldKind};

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated record ids.
pub const RECORD_ID_LENGTH: usize = 15;

/// A stored record: generated id plus schema-validated field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Text value of a field, if present and a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Field value rendered for comparison. `id` resolves to the record id;
    /// absent and null values render as the empty string.
    pub fn value_as_string(&self, name: &str) -> String {
        if name == "id" {
            return self.id.clone();
        }
        match self.fields.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    collections: BTreeMap<String, CollectionData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionData {
    schema: CollectionSchema,
    #[serde(default)]
    records: Vec<Record>,
}

impl StoreDocument {
    fn collection(&self, name: &str) -> Result<&CollectionData> {
        self.collections.get(name).ok_or_else(|| missing_collection(name))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut CollectionData> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))
    }
}

fn missing_collection(name: &str) -> Error {
    Error::Schema(format!("collection '{}' does not exist", name))
}

fn missing_record(collection: &str, id: &str) -> Error {
    Error::NotFound(format!("record '{}' not found in '{}'", id, collection))
}

fn generate_record_id() -> String {
    let mut rng = rand::thread_rng();
    (0..RECORD_ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Build the stored field map for a record.
///
/// `base` holds the current values (empty on create); `input` overrides them.
/// Fields not in the schema are dropped. Autodate fields ignore client input.
fn build_fields(
    schema: &CollectionSchema,
    base: &Map<String, Value>,
    input: &Map<String, Value>,
    now: DateTime<Utc>,
    creating: bool,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();

    for field in &schema.fields {
        let name = field.name.as_str();
        let provided = input.get(name).or_else(|| base.get(name));

        let value = match &field.kind {
            FieldKind::Text { required, max } => {
                let text = match provided {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(_) => {
                        return Err(Error::InvalidInput(format!(
                            "field '{}' must be text",
                            name
                        )))
                    }
                };
                if *required && text.trim().is_empty() {
                    return Err(Error::InvalidInput(format!("field '{}' is required", name)));
                }
                if *max > 0 && text.chars().count() > *max {
                    return Err(Error::InvalidInput(format!(
                        "field '{}' exceeds {} characters",
                        name, max
                    )));
                }
                Value::String(text)
            }
            FieldKind::Date { required } => match provided {
                None | Some(Value::Null) => {
                    if *required {
                        return Err(Error::InvalidInput(format!("field '{}' is required", name)));
                    }
                    Value::String(String::new())
                }
                Some(Value::String(s)) if s.trim().is_empty() => {
                    if *required {
                        return Err(Error::InvalidInput(format!("field '{}' is required", name)));
                    }
                    Value::String(String::new())
                }
                Some(Value::String(s)) => Value::String(normalize_date(s).ok_or_else(|| {
                    Error::InvalidInput(format!("field '{}' must be a valid date", name))
                })?),
                Some(_) => {
                    return Err(Error::InvalidInput(format!(
                        "field '{}' must be a date string",
                        name
                    )))
                }
            },
            FieldKind::Autodate {
                on_create,
                on_update,
            } => {
                let refresh = if creating { *on_create } else { *on_update };
                if refresh {
                    Value::String(format_datetime(now))
                } else {
                    base.get(name)
                        .cloned()
                        .unwrap_or_else(|| Value::String(String::new()))
                }
            }
        };

        out.insert(name.to_string(), value);
    }

    Ok(out)
}

/// Managed record-collection store.
///
/// Collections and their records live in one JSON document. Every write
/// builds the next document, persists it (temp file, then rename) and only
/// then swaps it in, so a failed write leaves the previous state intact.
/// A store without a path never touches the filesystem.
pub struct CollectionStore {
    path: Option<PathBuf>,
    document: RwLock<StoreDocument>,
}

impl CollectionStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreDocument>(&bytes).map_err(|e| {
                Error::Storage(format!("cannot parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => StoreDocument::default(),
            Err(e) => return Err(Error::Io(e)),
        };

        info!(
            subsystem = "collection",
            component = "store",
            op = "open",
            path = %path.display(),
            collections = document.collections.len(),
            "Opened record collection store"
        );

        Ok(Self {
            path: Some(path),
            document: RwLock::new(document),
        })
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: RwLock::new(StoreDocument::default()),
        }
    }

    async fn persist(&self, document: &StoreDocument) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Look up a collection definition by name.
    pub async fn find_collection(&self, name: &str) -> Option<CollectionSchema> {
        let document = self.document.read().await;
        document.collections.get(name).map(|c| c.schema.clone())
    }

    /// Create a collection or replace its definition, keeping its records.
    pub async fn save_collection(&self, schema: CollectionSchema) -> Result<()> {
        let mut document = self.document.write().await;
        let mut next = document.clone();

        match next.collections.get_mut(&schema.name) {
            Some(existing) => existing.schema = schema.clone(),
            None => {
                next.collections.insert(
                    schema.name.clone(),
                    CollectionData {
                        schema: schema.clone(),
                        records: Vec::new(),
                    },
                );
            }
        }

        self.persist(&next).await?;
        *document = next;

        debug!(
            subsystem = "collection",
            component = "store",
            op = "save_collection",
            collection = %schema.name,
            field_count = schema.fields.len(),
            "Saved collection definition"
        );
        Ok(())
    }

    /// Fetch one record by id.
    pub async fn get_record(&self, collection: &str, id: &str) -> Result<Record> {
        let document = self.document.read().await;
        document
            .collection(collection)?
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| missing_record(collection, id))
    }

    /// Records matching `filter`, ordered by `sort`.
    ///
    /// Records that compare equal on every sort key are returned newest
    /// insertion first.
    pub async fn find_records(
        &self,
        collection: &str,
        filter: &str,
        sort: &str,
    ) -> Result<Vec<Record>> {
        let expr = parse_filter(filter)?;
        let keys = parse_sort(sort)?;

        let document = self.document.read().await;
        let mut matched: Vec<(usize, &Record)> = document
            .collection(collection)?
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| expr.as_ref().map_or(true, |e| e.matches(record)))
            .collect();

        matched.sort_by(|(ia, a), (ib, b)| compare_records(&keys, a, b).then(ib.cmp(ia)));

        Ok(matched.into_iter().map(|(_, r)| r.clone()).collect())
    }

    /// Validate and insert a new record.
    pub async fn create_record(
        &self,
        collection: &str,
        input: Map<String, Value>,
    ) -> Result<Record> {
        let mut document = self.document.write().await;
        let mut next = document.clone();
        let data = next.collection_mut(collection)?;

        let fields = build_fields(&data.schema, &Map::new(), &input, Utc::now(), true)?;
        let mut id = generate_record_id();
        while data.records.iter().any(|r| r.id == id) {
            id = generate_record_id();
        }
        let record = Record::new(id, fields);
        data.records.push(record.clone());

        self.persist(&next).await?;
        *document = next;

        debug!(
            subsystem = "collection",
            component = "store",
            op = "create_record",
            collection = collection,
            record_id = %record.id,
            "Created record"
        );
        Ok(record)
    }

    /// Validate and apply `input` over an existing record.
    pub async fn update_record(
        &self,
        collection: &str,
        id: &str,
        input: Map<String, Value>,
    ) -> Result<Record> {
        let mut document = self.document.write().await;
        let mut next = document.clone();
        let data = next.collection_mut(collection)?;

        let position = data
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| missing_record(collection, id))?;
        let fields = build_fields(
            &data.schema,
            &data.records[position].fields,
            &input,
            Utc::now(),
            false,
        )?;
        data.records[position].fields = fields;
        let record = data.records[position].clone();

        self.persist(&next).await?;
        *document = next;
        Ok(record)
    }

    /// Remove a record.
    pub async fn delete_record(&self, collection: &str, id: &str) -> Result<()> {
        let mut document = self.document.write().await;
        let mut next = document.clone();
        let data = next.collection_mut(collection)?;

        let position = data
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| missing_record(collection, id))?;
        data.records.remove(position);

        self.persist(&next).await?;
        *document = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::schema::Field;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn store_with_posts() -> CollectionStore {
        let store = CollectionStore::in_memory();
        let mut schema = CollectionSchema::new("posts");
        schema.add_field(Field::text("title", true, 10));
        schema.add_field(Field::date("published", false));
        schema.add_field(Field::autodate("created", true, false));
        schema.add_field(Field::autodate("updated", true, true));
        store.save_collection(schema).await.unwrap();
        store
    }

    #[test]
    fn test_generated_ids_are_lowercase_alphanumeric() {
        let id = generate_record_id();
        assert_eq!(id.len(), RECORD_ID_LENGTH);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_create_fills_autodates_and_normalizes_dates() {
        let store = store_with_posts().await;
        let record = store
            .create_record(
                "posts",
                fields(&[
                    ("title", json!("hello")),
                    ("published", json!("2024-02-03")),
                    ("created", json!("1999-01-01 00:00:00.000Z")),
                    ("ignored", json!(1)),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(record.get_str("published"), Some("2024-02-03 00:00:00.000Z"));
        assert_ne!(record.get_str("created"), Some("1999-01-01 00:00:00.000Z"));
        assert_eq!(record.get_str("created"), record.get_str("updated"));
        assert!(!record.fields.contains_key("ignored"));
    }

    #[tokio::test]
    async fn test_create_validates_schema() {
        let store = store_with_posts().await;

        let missing = store.create_record("posts", Map::new()).await.unwrap_err();
        assert!(matches!(missing, Error::InvalidInput(ref m) if m.contains("required")));

        let too_long = store
            .create_record("posts", fields(&[("title", json!("x".repeat(11)))]))
            .await
            .unwrap_err();
        assert!(matches!(too_long, Error::InvalidInput(ref m) if m.contains("exceeds 10")));

        let bad_date = store
            .create_record(
                "posts",
                fields(&[("title", json!("ok")), ("published", json!("soon"))]),
            )
            .await
            .unwrap_err();
        assert!(matches!(bad_date, Error::InvalidInput(ref m) if m.contains("valid date")));

        let not_text = store
            .create_record("posts", fields(&[("title", json!(42))]))
            .await
            .unwrap_err();
        assert!(matches!(not_text, Error::InvalidInput(ref m) if m.contains("must be text")));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_schema_error() {
        let store = CollectionStore::in_memory();
        let err = store.find_records("nope", "", "").await.unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_created_and_merges_fields() {
        let store = store_with_posts().await;
        let created = store
            .create_record(
                "posts",
                fields(&[("title", json!("one")), ("published", json!("2024-01-01"))]),
            )
            .await
            .unwrap();

        let updated = store
            .update_record("posts", &created.id, fields(&[("title", json!("two"))]))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.get_str("title"), Some("two"));
        assert_eq!(updated.get_str("published"), created.get_str("published"));
        assert_eq!(updated.get_str("created"), created.get_str("created"));
        assert!(updated.get_str("updated") >= created.get_str("updated"));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = store_with_posts().await;
        assert!(matches!(
            store.get_record("posts", "missing").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.update_record("posts", "missing", Map::new()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete_record("posts", "missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_records_filters_and_sorts() {
        let store = store_with_posts().await;
        for (title, day) in [("a", "2024-01-02"), ("b", "2024-01-01"), ("c", "2024-01-03")] {
            store
                .create_record(
                    "posts",
                    fields(&[("title", json!(title)), ("published", json!(day))]),
                )
                .await
                .unwrap();
        }

        let all = store.find_records("posts", "", "-published").await.unwrap();
        let titles: Vec<_> = all.iter().map(|r| r.get_str("title").unwrap()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);

        let some = store
            .find_records("posts", "title != 'a'", "published")
            .await
            .unwrap();
        let titles: Vec<_> = some.iter().map(|r| r.get_str("title").unwrap()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_ties_return_newest_insertion_first() {
        let store = store_with_posts().await;
        for title in ["first", "second", "third"] {
            store
                .create_record(
                    "posts",
                    fields(&[("title", json!(title)), ("published", json!("2024-01-01"))]),
                )
                .await
                .unwrap();
        }

        let records = store.find_records("posts", "", "-published").await.unwrap();
        let titles: Vec<_> = records
            .iter()
            .map(|r| r.get_str("title").unwrap())
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let id = {
            let store = CollectionStore::open(&path).await.unwrap();
            let mut schema = CollectionSchema::new("posts");
            schema.add_field(Field::text("title", true, 0));
            store.save_collection(schema).await.unwrap();
            store
                .create_record("posts", fields(&[("title", json!("kept"))]))
                .await
                .unwrap()
                .id
        };
        assert!(path.exists());

        let reopened = CollectionStore::open(&path).await.unwrap();
        let record = reopened.get_record("posts", &id).await.unwrap();
        assert_eq!(record.get_str("title"), Some("kept"));
        assert!(reopened.find_collection("posts").await.is_some());
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = CollectionStore::open(&path).await.err().unwrap();
        assert!(matches!(err, Error::Storage(_)));
    }
}
