//! Utility functions for value normalization and conversion

use std::collections::{BTreeMap, HashMap};

use carina_core::resource::{Attributes, Value};

/// Normalize a location (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Read the `tags` attribute into the API's tag map
///
/// Returns `None` when no tags are set so the field is left out of the body.
pub fn expand_tags(attrs: &Attributes<'_>) -> Option<BTreeMap<String, String>> {
    let tags = attrs.get_string_map("tags");
    if tags.is_empty() {
        None
    } else {
        Some(tags.into_iter().collect())
    }
}

/// Convert API tags back into the `tags` attribute
pub fn flatten_tags(tags: Option<&BTreeMap<String, String>>) -> Value {
    Value::Map(
        tags.into_iter()
            .flatten()
            .map(|(k, v)| (k.clone(), Value::string(v)))
            .collect::<HashMap<_, _>>(),
    )
}

/// Insert a string attribute when the API returned one
pub fn set_string(attributes: &mut HashMap<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), Value::string(value));
    }
}
