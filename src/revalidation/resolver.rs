//! Resolution of `{variable}` placeholders against a record.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::domain::{BuiltinProperty, Record};

use super::error::ResolveError;
use super::expander::{TemplateExpander, VariableValues};
use super::extractor::FieldValueExtractor;
use super::field_path::FieldPath;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Distinct placeholder tokens in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Turns path templates into concrete paths for one record.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableResolver {
    extractor: FieldValueExtractor,
    expander: TemplateExpander,
}

impl VariableResolver {
    pub fn new(extractor: FieldValueExtractor, expander: TemplateExpander) -> Self {
        Self {
            extractor,
            expander,
        }
    }

    /// Value set for every placeholder in `template`.
    pub fn resolve_variables(
        &self,
        record: &dyn Record,
        template: &str,
    ) -> Result<VariableValues, ResolveError> {
        let mut values = VariableValues::new();
        for token in placeholders(template) {
            let path = FieldPath::parse(&token)?;
            let token_values = self.extractor.extract(record, &path)?;
            values.insert(token, token_values);
        }
        Ok(values)
    }

    /// Concrete paths for `template`.
    ///
    /// Resolution failures are logged and degrade to the literal template.
    pub fn resolve_paths(&self, record: &dyn Record, template: &str) -> BTreeSet<String> {
        match self.resolve_variables(record, template) {
            Ok(values) => self.expander.expand(template, &values),
            Err(err) => {
                warn!(
                    template,
                    error = %err,
                    record_id = %record.property(BuiltinProperty::Id),
                    "Failed to resolve path template variables; using template as-is"
                );
                BTreeSet::from([template.to_string()])
            }
        }
    }
}
