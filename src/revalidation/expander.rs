//! Cartesian expansion of path templates.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

pub const DEFAULT_MAX_EXPANDED_PATHS: usize = 256;

/// Placeholder token mapped to the distinct values it may take.
pub type VariableValues = BTreeMap<String, BTreeSet<String>>;

/// Substitutes one value per placeholder, producing every combination.
#[derive(Debug, Clone, Copy)]
pub struct TemplateExpander {
    max_paths: usize,
}

impl Default for TemplateExpander {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPANDED_PATHS)
    }
}

impl TemplateExpander {
    /// `max_paths` is clamped to at least one.
    pub fn new(max_paths: usize) -> Self {
        Self {
            max_paths: max_paths.max(1),
        }
    }

    pub fn max_paths(&self) -> usize {
        self.max_paths
    }

    /// Expand `template` against `values`.
    ///
    /// Tokens with no values are left in place. Substituted values are never
    /// scanned for placeholders again. Combinations past `max_paths` are
    /// dropped.
    pub fn expand(&self, template: &str, values: &VariableValues) -> BTreeSet<String> {
        self.candidates(template, values).into_iter().collect()
    }

    /// Expansion before deduplication.
    pub(crate) fn candidates(&self, template: &str, values: &VariableValues) -> Vec<String> {
        let slots: Vec<(String, Vec<&str>)> = values
            .iter()
            .filter(|(_, token_values)| !token_values.is_empty())
            .map(|(token, token_values)| {
                (
                    format!("{{{token}}}"),
                    token_values.iter().map(String::as_str).collect(),
                )
            })
            .filter(|(placeholder, _)| template.contains(placeholder.as_str()))
            .collect();
        let segments = split(template, &slots);

        let total = slots
            .iter()
            .fold(1usize, |acc, (_, choices)| acc.saturating_mul(choices.len()));
        let limit = total.min(self.max_paths);

        // One index per slot, advanced like an odometer.
        let mut picks = vec![0usize; slots.len()];
        let mut candidates = Vec::with_capacity(limit);
        while candidates.len() < limit {
            candidates.push(
                segments
                    .iter()
                    .map(|segment| match *segment {
                        Segment::Literal(text) => text,
                        Segment::Slot(slot) => slots[slot].1[picks[slot]],
                    })
                    .collect::<String>(),
            );
            for slot in (0..picks.len()).rev() {
                picks[slot] += 1;
                if picks[slot] < slots[slot].1.len() {
                    break;
                }
                picks[slot] = 0;
            }
        }

        if total > self.max_paths {
            warn!(
                template,
                max_paths = self.max_paths,
                combinations = total,
                "Template expansion truncated at path limit"
            );
        }

        candidates
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Literal(&'a str),
    Slot(usize),
}

/// Cut `template` at every occurrence of a slot's placeholder.
fn split<'a>(template: &'a str, slots: &[(String, Vec<&str>)]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut rest = template;
    while let Some((at, slot)) = slots
        .iter()
        .enumerate()
        .filter_map(|(slot, (placeholder, _))| {
            rest.find(placeholder.as_str()).map(|at| (at, slot))
        })
        .min()
    {
        segments.push(Segment::Literal(&rest[..at]));
        segments.push(Segment::Slot(slot));
        rest = &rest[at + slots[slot].0.len()..];
    }
    segments.push(Segment::Literal(rest));
    segments
}
