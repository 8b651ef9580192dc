//! Collection and field definitions for the record-collection store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage format for date and autodate values, e.g. `2024-01-01 00:00:00.000Z`.
pub const DATETIME_STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// Field type and its constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text, `max` counted in characters (0 means unlimited).
    Text { required: bool, max: usize },
    /// Calendar date or timestamp supplied by the client.
    Date { required: bool },
    /// Timestamp maintained by the store.
    Autodate { on_create: bool, on_update: bool },
}

/// A named field in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    pub fn text(name: &str, required: bool, max: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text { required, max },
        }
    }

    pub fn date(name: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Date { required },
        }
    }

    pub fn autodate(name: &str, on_create: bool, on_update: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Autodate {
                on_create,
                on_update,
            },
        }
    }
}

/// A named, schema-bearing record container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<Field>,
}

impl CollectionSchema {
    /// An empty collection definition.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Append a field unless one with the same name already exists.
    ///
    /// Returns whether the field was added. An existing definition is never
    /// replaced.
    pub fn add_field(&mut self, field: Field) -> bool {
        if self.has_field(&field.name) {
            return false;
        }
        self.fields.push(field);
        true
    }
}

/// Format a timestamp in the store's date format.
pub fn format_datetime(ts: DateTime<Utc>) -> String {
    ts.format(DATETIME_STORAGE_FORMAT).to_string()
}

/// Parse a stored timestamp.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATETIME_STORAGE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Normalize a client-supplied date value to the storage format.
///
/// Accepts a bare `YYYY-MM-DD` day (stored as midnight UTC), the storage
/// format itself, or RFC 3339.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|dt| format_datetime(dt.and_utc()));
    }
    if let Some(ts) = parse_datetime(value) {
        return Some(format_datetime(ts));
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| format_datetime(ts.with_timezone(&Utc)))
}
