//! Ordered rules for turning a field item into path-safe strings.
//!
//! The first rule that matches an item wins. Rules see the owning record so
//! that reference items can be rendered by their target's label.

use serde_json::Value;

use crate::domain::{BuiltinProperty, FieldItem, Record};

/// A formatting rule. `None` means "does not apply, try the next rule".
pub type FormatRule = fn(&dyn Record, &FieldItem) -> Option<Vec<String>>;

/// Rules in precedence order.
pub const FORMAT_RULES: &[(&str, FormatRule)] = &[
    ("value", scalar_value),
    ("reference_label", reference_label),
    ("uri", uri),
    ("coordinates", coordinates),
    ("values", array_members),
    ("coerce", coerce),
];

/// Render one item using the first applicable rule.
pub fn format_item(record: &dyn Record, item: &FieldItem) -> Vec<String> {
    FORMAT_RULES
        .iter()
        .find_map(|(_, rule)| rule(record, item))
        .unwrap_or_default()
}

fn scalar_value(_record: &dyn Record, item: &FieldItem) -> Option<Vec<String>> {
    match item.value.as_ref()? {
        Value::String(text) => Some(vec![text.clone()]),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(vec![value.to_string()]),
        _ => None,
    }
}

fn reference_label(record: &dyn Record, item: &FieldItem) -> Option<Vec<String>> {
    let target = record.dereference(item)?;
    Some(vec![target.property(BuiltinProperty::Label)])
}

fn uri(_record: &dyn Record, item: &FieldItem) -> Option<Vec<String>> {
    item.uri.as_ref().map(|uri| vec![uri.clone()])
}

fn coordinates(_record: &dyn Record, item: &FieldItem) -> Option<Vec<String>> {
    match (item.lat, item.lon) {
        (Some(lat), Some(lon)) => Some(vec![format!("{lat},{lon}")]),
        _ => None,
    }
}

fn array_members(_record: &dyn Record, item: &FieldItem) -> Option<Vec<String>> {
    let members = match (&item.values, &item.value) {
        (Some(values), _) => values.as_slice(),
        (None, Some(Value::Array(values))) => values.as_slice(),
        _ => return None,
    };

    let mut out = Vec::with_capacity(members.len());
    for member in members {
        flatten_into(member, &mut out);
    }
    Some(out)
}

fn coerce(_record: &dyn Record, item: &FieldItem) -> Option<Vec<String>> {
    if let Some(target_id) = &item.target_id {
        return Some(vec![target_id.clone()]);
    }

    match item.extra.len() {
        0 => None,
        1 => {
            let mut out = Vec::new();
            item.extra.values().for_each(|value| flatten_into(value, &mut out));
            Some(out)
        }
        _ => serde_json::to_string(&item.extra).ok().map(|json| vec![json]),
    }
}

fn flatten_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(text) => out.push(text.clone()),
        Value::Number(_) | Value::Bool(_) => out.push(value.to_string()),
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        Value::Object(_) => out.push(value.to_string()),
    }
}
