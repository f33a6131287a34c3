//! Resource type definitions
//!
//! - `machine_learning_workspace` - azurerm_machine_learning_workspace
//! - `relay_namespace` - azurerm_relay_namespace

pub mod machine_learning_workspace;
pub mod relay_namespace;

use std::collections::HashMap;

use carina_core::provider::{ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Attributes, Resource, Value};
use carina_core::schema::ResourceSchema;

use crate::utils::normalize_location;

pub use machine_learning_workspace::MachineLearningWorkspaceType;
pub use relay_namespace::RelayNamespaceType;

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(MachineLearningWorkspaceType),
        Box::new(RelayNamespaceType),
    ]
}

/// Find a resource type by name
pub fn find(name: &str) -> Option<Box<dyn ResourceType>> {
    resource_types().into_iter().find(|t| t.name() == name)
}

/// Apply schema defaults and validate desired attributes
///
/// `location` is normalized so it compares equal to what a read returns.
pub fn prepare(schema: &ResourceSchema, resource: &Resource) -> ProviderResult<HashMap<String, Value>> {
    let mut attributes = resource.attributes.clone();
    schema.apply_defaults(&mut attributes);
    schema.validate(&attributes)?;

    if let Some(Value::String(location)) = attributes.get_mut("location") {
        *location = normalize_location(location);
    }
    Ok(attributes)
}

/// Reject updates that change attributes which force a new resource
pub fn check_in_place(
    schema: &ResourceSchema,
    from: &HashMap<String, Value>,
    to: &HashMap<String, Value>,
) -> ProviderResult<()> {
    let changed = schema.replacement_attributes(from, to);
    if changed.is_empty() {
        return Ok(());
    }
    Err(ProviderError::validation(format!(
        "{} cannot be updated in place; the resource must be replaced (changed: {})",
        schema.resource_type,
        changed.join(", ")
    )))
}

pub fn required_string(attrs: &Attributes<'_>, key: &str) -> ProviderResult<String> {
    attrs
        .get_string(key)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::validation(format!("`{}` must be set", key)))
}
