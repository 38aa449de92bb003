//! In-memory record graph loaded from JSON documents.
//!
//! ```json
//! {
//!   "records": [
//!     {
//!       "id": "12",
//!       "uuid": "5b1f6c1e-8a3c-4f0e-9d5e-7f3f0b0c2a11",
//!       "entity_type": "node",
//!       "bundle": "article",
//!       "language": "en",
//!       "label": "Hello",
//!       "fields": { "field_author": [{ "target_id": "3" }] }
//!     }
//!   ]
//! }
//! ```
//!
//! References resolve by id within the same store.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::error::DomainError;
use super::record::{BuiltinProperty, FieldItem, Record};

const DEFAULT_ENTITY_TYPE: &str = "node";
const DEFAULT_LANGUAGE: &str = "und";

#[derive(Debug, Clone, Deserialize)]
pub struct RecordData {
    pub id: String,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
    pub bundle: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldItem>>,
}

fn default_entity_type() -> String {
    DEFAULT_ENTITY_TYPE.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Deserialize)]
struct RecordDocument {
    records: Vec<RecordData>,
}

/// Records keyed by id.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Arc<RecordData>>,
}

impl RecordStore {
    pub fn from_records(records: impl IntoIterator<Item = RecordData>) -> Arc<Self> {
        let records = records
            .into_iter()
            .map(|data| (data.id.clone(), Arc::new(data)))
            .collect();
        Arc::new(Self { records })
    }

    pub fn from_json(json: &str) -> Result<Arc<Self>, DomainError> {
        let document: RecordDocument = serde_json::from_str(json)
            .map_err(|err| DomainError::validation(format!("invalid record document: {err}")))?;
        Ok(Self::from_records(document.records))
    }

    pub async fn load(path: &Path) -> Result<Arc<Self>, DomainError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| DomainError::Io {
                path: path.display().to_string(),
                source: err,
            })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id.
    pub fn get(self: &Arc<Self>, id: &str) -> Option<MemoryRecord> {
        self.records.get(id).map(|data| MemoryRecord {
            data: Arc::clone(data),
            store: Arc::clone(self),
        })
    }

    /// Like [`RecordStore::get`] but reports a missing record as an error.
    pub fn require(self: &Arc<Self>, id: &str) -> Result<MemoryRecord, DomainError> {
        self.get(id).ok_or_else(|| DomainError::not_found("record", id))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRecord {
    data: Arc<RecordData>,
    store: Arc<RecordStore>,
}

impl Record for MemoryRecord {
    fn entity_type(&self) -> &str {
        &self.data.entity_type
    }

    fn property(&self, property: BuiltinProperty) -> String {
        match property {
            BuiltinProperty::Id => self.data.id.clone(),
            BuiltinProperty::Uuid => self.data.uuid.to_string(),
            BuiltinProperty::Language => self.data.language.clone(),
            BuiltinProperty::Bundle => self.data.bundle.clone(),
            BuiltinProperty::Label => self.data.label.clone(),
        }
    }

    fn has_field(&self, name: &str) -> bool {
        self.data.fields.contains_key(name)
    }

    fn field(&self, name: &str) -> &[FieldItem] {
        self.data
            .fields
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn dereference(&self, item: &FieldItem) -> Option<Arc<dyn Record>> {
        let target = item.target_id.as_deref()?;
        self.store
            .get(target)
            .map(|record| Arc::new(record) as Arc<dyn Record>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "records": [
            {
                "id": "1",
                "bundle": "article",
                "label": "First",
                "fields": {
                    "field_related": [{ "target_id": "2" }, { "target_id": "404" }],
                    "field_empty": []
                }
            },
            { "id": "2", "bundle": "page", "label": "Second", "language": "fr" }
        ]
    }"#;

    #[test]
    fn loads_records_with_defaults() {
        let store = RecordStore::from_json(DOCUMENT).expect("valid document");
        assert_eq!(store.len(), 2);

        let first = store.require("1").expect("record 1");
        assert_eq!(first.entity_type(), "node");
        assert_eq!(first.property(BuiltinProperty::Language), "und");
        assert_eq!(first.property(BuiltinProperty::Bundle), "article");
        assert!(first.has_field("field_empty"));
        assert!(first.field("field_empty").is_empty());
        assert!(!first.has_field("field_missing"));
        assert!(first.field("field_missing").is_empty());
    }

    #[test]
    fn dereference_resolves_within_store() {
        let store = RecordStore::from_json(DOCUMENT).expect("valid document");
        let first = store.require("1").expect("record 1");
        let items = first.field("field_related");

        let target = first.dereference(&items[0]).expect("resolvable reference");
        assert_eq!(target.property(BuiltinProperty::Label), "Second");
        assert_eq!(target.property(BuiltinProperty::Language), "fr");

        assert!(first.dereference(&items[1]).is_none());
        assert!(first.dereference(&FieldItem::scalar("x")).is_none());
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = RecordStore::from_json(DOCUMENT).expect("valid document");
        let err = store.require("99").expect_err("missing record");
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = RecordStore::from_json("{").expect_err("invalid json");
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
