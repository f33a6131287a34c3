//! Managed service identity shared by resources that accept one

use std::collections::{BTreeMap, HashMap};

use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{Attributes, Value};
use carina_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use serde::{Deserialize, Serialize};

use crate::ids::{self, USER_ASSIGNED_IDENTITY};

pub const SYSTEM_ASSIGNED: &str = "SystemAssigned";
pub const USER_ASSIGNED: &str = "UserAssigned";
pub const SYSTEM_ASSIGNED_USER_ASSIGNED: &str = "SystemAssigned, UserAssigned";

/// Spelling of the combined type on the wire
const SYSTEM_ASSIGNED_USER_ASSIGNED_WIRE: &str = "SystemAssigned,UserAssigned";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<BTreeMap<String, UserAssignedIdentityDetails>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentityDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
}

/// Schema of the `identity` block
pub fn schema() -> AttributeSchema {
    AttributeSchema::new(
        "identity",
        AttributeType::Block(
            BlockSchema::new()
                .max_items(1)
                .attribute(
                    AttributeSchema::new(
                        "type",
                        types::one_of(&[
                            SYSTEM_ASSIGNED,
                            USER_ASSIGNED,
                            SYSTEM_ASSIGNED_USER_ASSIGNED,
                        ]),
                    )
                    .required(),
                )
                .attribute(AttributeSchema::new(
                    "identity_ids",
                    AttributeType::List(Box::new(ids::user_assigned_identity_id())),
                ))
                .attribute(AttributeSchema::new("principal_id", AttributeType::String).computed())
                .attribute(AttributeSchema::new("tenant_id", AttributeType::String).computed()),
        ),
    )
    .required()
}

/// Build the API identity from the `identity` block
pub fn expand(block: &Attributes<'_>) -> ProviderResult<ManagedIdentity> {
    let kind = block
        .get_string("type")
        .ok_or_else(|| ProviderError::validation("`identity.type` must be set"))?;
    let identity_ids = block.get_string_list("identity_ids");

    let user_assigned = kind == USER_ASSIGNED || kind == SYSTEM_ASSIGNED_USER_ASSIGNED;
    if user_assigned && identity_ids.is_empty() {
        return Err(ProviderError::validation(format!(
            "`identity_ids` must be specified when `type` is set to {:?}",
            kind
        )));
    }
    if !user_assigned && !identity_ids.is_empty() {
        return Err(ProviderError::validation(format!(
            "`identity_ids` can only be specified when `type` includes `UserAssigned`; but `type` is currently {:?}",
            kind
        )));
    }

    let wire_kind = if kind == SYSTEM_ASSIGNED_USER_ASSIGNED {
        SYSTEM_ASSIGNED_USER_ASSIGNED_WIRE
    } else {
        kind
    };

    Ok(ManagedIdentity {
        kind: wire_kind.to_string(),
        principal_id: None,
        tenant_id: None,
        user_assigned_identities: user_assigned.then(|| {
            identity_ids
                .into_iter()
                .map(|id| (id, UserAssignedIdentityDetails::default()))
                .collect()
        }),
    })
}

/// Convert the API identity back into the `identity` block
///
/// Identity IDs are re-emitted in canonical casing.
pub fn flatten(identity: Option<&ManagedIdentity>) -> ProviderResult<Value> {
    let Some(identity) = identity.filter(|i| !i.kind.eq_ignore_ascii_case("None")) else {
        return Ok(Value::List(Vec::new()));
    };

    let kind = if identity
        .kind
        .eq_ignore_ascii_case(SYSTEM_ASSIGNED_USER_ASSIGNED_WIRE)
    {
        SYSTEM_ASSIGNED_USER_ASSIGNED.to_string()
    } else {
        identity.kind.clone()
    };

    let mut identity_ids = Vec::new();
    for id in identity.user_assigned_identities.iter().flat_map(|m| m.keys()) {
        let canonical = USER_ASSIGNED_IDENTITY
            .parse_insensitively(id)
            .map_err(|e| ProviderError::from(e).context("parsing user assigned identity", id))?;
        identity_ids.push(Value::string(canonical.to_string()));
    }

    let mut block = HashMap::from([
        ("type".to_string(), Value::string(kind)),
        ("identity_ids".to_string(), Value::List(identity_ids)),
    ]);
    if let Some(principal_id) = &identity.principal_id {
        block.insert("principal_id".to_string(), Value::string(principal_id));
    }
    if let Some(tenant_id) = &identity.tenant_id {
        block.insert("tenant_id".to_string(), Value::string(tenant_id));
    }
    Ok(Value::block(block))
}
