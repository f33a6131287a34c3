//! Resource ID formats for the ARM resource types this provider touches

use carina_core::id::ResourceIdFormat;
use carina_core::resource::Value;
use carina_core::schema::AttributeType;

pub const MACHINE_LEARNING_WORKSPACE: ResourceIdFormat = ResourceIdFormat::new(
    "Microsoft.MachineLearningServices",
    &["workspaces"],
    "Machine Learning Workspace",
);

pub const RELAY_NAMESPACE: ResourceIdFormat =
    ResourceIdFormat::new("Microsoft.Relay", &["namespaces"], "Relay Namespace");

pub const RELAY_AUTHORIZATION_RULE: ResourceIdFormat = ResourceIdFormat::new(
    "Microsoft.Relay",
    &["namespaces", "authorizationRules"],
    "Relay Namespace Authorization Rule",
);

pub const KEY_VAULT: ResourceIdFormat =
    ResourceIdFormat::new("Microsoft.KeyVault", &["vaults"], "Key Vault");

pub const APPLICATION_INSIGHTS: ResourceIdFormat = ResourceIdFormat::new(
    "Microsoft.Insights",
    &["components"],
    "Application Insights Component",
);

pub const STORAGE_ACCOUNT: ResourceIdFormat =
    ResourceIdFormat::new("Microsoft.Storage", &["storageAccounts"], "Storage Account");

pub const USER_ASSIGNED_IDENTITY: ResourceIdFormat = ResourceIdFormat::new(
    "Microsoft.ManagedIdentity",
    &["userAssignedIdentities"],
    "User Assigned Identity",
);

pub const CONTAINER_REGISTRY: ResourceIdFormat = ResourceIdFormat::new(
    "Microsoft.ContainerRegistry",
    &["registries"],
    "Container Registry",
);

pub const SUBNET: ResourceIdFormat = ResourceIdFormat::new(
    "Microsoft.Network",
    &["virtualNetworks", "subnets"],
    "Subnet",
);

/// Re-emit an API-returned ID in the canonical casing of `format`
pub fn canonicalize(format: &ResourceIdFormat, input: &str) -> Result<String, String> {
    format
        .parse_insensitively(input)
        .map(|id| id.to_string())
        .map_err(|e| e.to_string())
}

macro_rules! id_reference {
    ($fn_name:ident, $format:ident) => {
        /// String attribute that must hold an ID of this shape
        pub fn $fn_name() -> AttributeType {
            AttributeType::Custom {
                name: stringify!($fn_name).to_string(),
                base: Box::new(AttributeType::String),
                validate: |value| check(&$format, value),
            }
        }
    };
}

id_reference!(key_vault_id, KEY_VAULT);
id_reference!(application_insights_id, APPLICATION_INSIGHTS);
id_reference!(storage_account_id, STORAGE_ACCOUNT);
id_reference!(user_assigned_identity_id, USER_ASSIGNED_IDENTITY);
id_reference!(container_registry_id, CONTAINER_REGISTRY);
id_reference!(subnet_id, SUBNET);

fn check(format: &ResourceIdFormat, value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) => format.parse(s).map(|_| ()).map_err(|e| e.to_string()),
        _ => Err("Expected string".to_string()),
    }
}
