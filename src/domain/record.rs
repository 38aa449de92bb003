//! Read-only record abstraction consumed by the revalidation pipeline.
//!
//! Records are owned by an external content store; the pipeline only reads
//! them and follows references between them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Properties every record exposes regardless of its field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinProperty {
    /// Store-local identifier.
    Id,
    /// Stable unique identifier.
    Uuid,
    /// Language code.
    Language,
    /// Bundle or type tag.
    Bundle,
    /// Display label.
    Label,
}

impl BuiltinProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Uuid => "uuid",
            Self::Language => "language",
            Self::Bundle => "bundle",
            Self::Label => "label",
        }
    }
}

impl FromStr for BuiltinProperty {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "id" => Ok(Self::Id),
            "uuid" => Ok(Self::Uuid),
            "language" => Ok(Self::Language),
            "bundle" => Ok(Self::Bundle),
            "label" => Ok(Self::Label),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BuiltinProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single item of a (possibly multi-valued) field.
///
/// Items are property bags: a reference item carries `target_id`, a link
/// carries `uri`, a geolocation carries `lat`/`lon`, and so on. Properties
/// that do not map onto a known facet are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FieldItem {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn reference(target_id: impl Into<String>) -> Self {
        Self {
            target_id: Some(target_id.into()),
            ..Default::default()
        }
    }

    pub fn link(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn coordinates(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    pub fn list<I, V>(members: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            values: Some(members.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.target_id.is_some()
    }
}

/// Read-only view of a content record.
pub trait Record: Send + Sync + fmt::Debug {
    /// Entity type of the record, e.g. `node` or `taxonomy_term`.
    fn entity_type(&self) -> &str;

    /// String form of a built-in property.
    fn property(&self, property: BuiltinProperty) -> String;

    fn has_field(&self, name: &str) -> bool;

    /// Items of the named field; empty when absent or empty.
    fn field(&self, name: &str) -> &[FieldItem];

    /// Resolve a reference item into the record it points at.
    fn dereference(&self, item: &FieldItem) -> Option<Arc<dyn Record>>;
}
