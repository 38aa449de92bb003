//! Per-bundle revalidation settings.
//!
//! Configured in `revalidator.toml`:
//!
//! ```toml
//! [[revalidators]]
//! entity_type = "node"
//! bundle = "article"
//! revalidate_page = true
//! additional_paths = """
//! /blog
//! /tags/{field_tags.name}
//! """
//! ```

use serde::{Deserialize, Deserializer};

use crate::domain::{BuiltinProperty, Record};

/// Which paths to revalidate for one entity type + bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RevalidatorSettings {
    pub entity_type: String,
    pub bundle: String,
    /// Revalidate the record's own canonical page.
    pub revalidate_page: bool,
    /// Extra path templates, possibly with `{variable}` placeholders.
    #[serde(deserialize_with = "deserialize_paths")]
    pub additional_paths: Vec<String>,
}

impl RevalidatorSettings {
    pub fn new(entity_type: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            ..Default::default()
        }
    }

    pub fn with_page(mut self) -> Self {
        self.revalidate_page = true;
        self
    }

    pub fn with_paths(mut self, paths: &str) -> Self {
        self.additional_paths = split_paths(paths);
        self
    }

    pub fn applies_to(&self, record: &dyn Record) -> bool {
        self.entity_type == record.entity_type()
            && self.bundle == record.property(BuiltinProperty::Bundle)
    }
}

/// Find the settings for `record`.
pub fn settings_for<'a>(
    revalidators: &'a [RevalidatorSettings],
    record: &dyn Record,
) -> Option<&'a RevalidatorSettings> {
    revalidators
        .iter()
        .find(|settings| settings.applies_to(record))
}

/// Split a newline-separated list, trimming lines and dropping blanks.
pub fn split_paths(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_paths<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPaths {
        Text(String),
        List(Vec<String>),
    }

    Ok(match RawPaths::deserialize(deserializer)? {
        RawPaths::Text(text) => split_paths(&text),
        RawPaths::List(list) => list
            .iter()
            .flat_map(|entry| split_paths(entry))
            .collect(),
    })
}
