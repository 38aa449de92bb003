//! Field value extraction over the record reference graph.

use std::collections::BTreeSet;

use tracing::warn;

use crate::domain::{BuiltinProperty, Record};

use super::error::ResolveError;
use super::field_path::FieldPath;
use super::format::format_item;

pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 8;

/// Computes the set of strings a field path can take on a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldValueExtractor {
    max_depth: usize,
}

impl Default for FieldValueExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRAVERSAL_DEPTH)
    }
}

impl FieldValueExtractor {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Distinct, non-empty values of `path` on `record`.
    ///
    /// A missing field is not an error: it logs a warning and contributes no
    /// values.
    pub fn extract(
        &self,
        record: &dyn Record,
        path: &FieldPath,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let mut values = BTreeSet::new();
        match path {
            FieldPath::Builtin(property) => {
                values.insert(record.property(*property));
            }
            FieldPath::Fields(segments) => {
                self.collect(record, segments, path, 0, &mut values)?;
            }
        }
        values.retain(|value| !value.is_empty());
        Ok(values)
    }

    fn collect(
        &self,
        record: &dyn Record,
        segments: &[String],
        path: &FieldPath,
        depth: usize,
        values: &mut BTreeSet<String>,
    ) -> Result<(), ResolveError> {
        if depth > self.max_depth {
            return Err(ResolveError::DepthExceeded {
                path: path.to_string(),
                limit: self.max_depth,
            });
        }

        let Some((name, rest)) = segments.split_first() else {
            return Ok(());
        };

        if !record.has_field(name) {
            warn!(
                field = %name,
                field_path = %path,
                entity_type = record.entity_type(),
                bundle = %record.property(BuiltinProperty::Bundle),
                "Field not present on record"
            );
            return Ok(());
        }

        for item in record.field(name) {
            if !rest.is_empty()
                && let Some(nested) = record.dereference(item)
            {
                self.collect(nested.as_ref(), rest, path, depth + 1, values)?;
                continue;
            }
            values.extend(format_item(record, item));
        }

        Ok(())
    }
}
