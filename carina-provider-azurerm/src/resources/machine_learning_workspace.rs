//! azurerm_machine_learning_workspace

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use std::time::Duration;

use carina_core::id::{ResourceId, ResourceIdFormat};
use carina_core::lifecycle::{DeleteConfirmation, Lookup, Reconciler};
use carina_core::provider::{ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Attributes, Resource, State, Value};
use carina_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};
use carina_core::timeouts::Timeouts;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{check_in_place, prepare, required_string};
use crate::client::ArmResource;
use crate::identity::{self, ManagedIdentity};
use crate::ids::{
    self, APPLICATION_INSIGHTS, KEY_VAULT, MACHINE_LEARNING_WORKSPACE, USER_ASSIGNED_IDENTITY,
    canonicalize,
};
use crate::provider::{AzurermProvider, with_read_timeout};
use crate::utils::{expand_tags, flatten_tags, normalize_location, set_string};

pub const TYPE_NAME: &str = "azurerm_machine_learning_workspace";
const API_VERSION: &str = "2023-10-01";

const KIND_DEFAULT: &str = "Default";
const KIND_FEATURE_STORE: &str = "FeatureStore";
const ENCRYPTION_ENABLED: &str = "Enabled";
const PUBLIC_NETWORK_ACCESS_ENABLED: &str = "Enabled";
const PUBLIC_NETWORK_ACCESS_DISABLED: &str = "Disabled";

static WORKSPACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{2,32}$").expect("WORKSPACE_NAME is a valid regex")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ManagedIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<WorkspaceProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_insights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hbi_workspace: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_build_compute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_user_assigned_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v1_legacy_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_network: Option<ManagedNetworkSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serverless_compute_settings: Option<ServerlessComputeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_store_settings: Option<FeatureStoreSettings>,
    #[serde(default, skip_serializing)]
    pub discovery_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<CmkIdentity>,
    pub key_vault_properties: EncryptionKeyVaultProperties,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmkIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_assigned_identity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionKeyVaultProperties {
    #[serde(default)]
    pub key_vault_arm_id: String,
    #[serde(default)]
    pub key_identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedNetworkSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerlessComputeSettings {
    #[serde(
        rename = "serverlessComputeCustomSubnet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_subnet: Option<String>,
    #[serde(
        rename = "serverlessComputeNoPublicIP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub no_public_ip: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_runtime: Option<ComputeRuntime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_store_connection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_store_connection_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRuntime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spark_runtime_version: Option<String>,
}

pub struct MachineLearningWorkspaceType;

impl ResourceType for MachineLearningWorkspaceType {
    fn name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_description("Machine Learning Workspace")
            .attribute(
                AttributeSchema::new("name", workspace_name())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("location", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("application_insights_id", ids::application_insights_id())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("key_vault_id", ids::key_vault_id())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("storage_account_id", ids::storage_account_id())
                    .required()
                    .force_new(),
            )
            .attribute(identity::schema())
            .attribute(
                AttributeSchema::new("kind", types::one_of(&[KIND_DEFAULT, KIND_FEATURE_STORE]))
                    .with_default(Value::string(KIND_DEFAULT)),
            )
            .attribute(AttributeSchema::new(
                "feature_store",
                AttributeType::Block(
                    BlockSchema::new()
                        .max_items(1)
                        .attribute(AttributeSchema::new(
                            "computer_spark_runtime_version",
                            AttributeType::String,
                        ))
                        .attribute(AttributeSchema::new(
                            "offline_connection_name",
                            AttributeType::String,
                        ))
                        .attribute(AttributeSchema::new(
                            "online_connection_name",
                            AttributeType::String,
                        )),
                ),
            ))
            .attribute(AttributeSchema::new(
                "primary_user_assigned_identity",
                ids::user_assigned_identity_id(),
            ))
            .attribute(
                AttributeSchema::new("container_registry_id", ids::container_registry_id())
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("public_network_access_enabled", AttributeType::Bool)
                    .computed()
                    .optional(),
            )
            .attribute(AttributeSchema::new(
                "image_build_compute_name",
                AttributeType::String,
            ))
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new(
                    "encryption",
                    AttributeType::Block(
                        BlockSchema::new()
                            .max_items(1)
                            .attribute(
                                AttributeSchema::new("key_vault_id", ids::key_vault_id())
                                    .required(),
                            )
                            .attribute(AttributeSchema::new("key_id", types::http_url()).required())
                            .attribute(AttributeSchema::new(
                                "user_assigned_identity_id",
                                ids::user_assigned_identity_id(),
                            )),
                    ),
                )
                .force_new(),
            )
            .attribute(AttributeSchema::new(
                "managed_network",
                AttributeType::Block(
                    BlockSchema::new().max_items(1).attribute(AttributeSchema::new(
                        "isolation_mode",
                        types::one_of(&[
                            "Disabled",
                            "AllowInternetOutbound",
                            "AllowOnlyApprovedOutbound",
                        ]),
                    )),
                ),
            ))
            .attribute(AttributeSchema::new("friendly_name", AttributeType::String))
            .attribute(
                AttributeSchema::new("high_business_impact", AttributeType::Bool).force_new(),
            )
            .attribute(
                AttributeSchema::new("sku_name", types::one_of(&["Basic"]))
                    .with_default(Value::string("Basic")),
            )
            .attribute(
                AttributeSchema::new("v1_legacy_mode_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(AttributeSchema::new(
                "serverless_compute",
                AttributeType::Block(
                    BlockSchema::new()
                        .max_items(1)
                        .attribute(AttributeSchema::new("subnet_id", ids::subnet_id()))
                        .attribute(
                            AttributeSchema::new("public_ip_enabled", AttributeType::Bool)
                                .with_default(Value::Bool(false)),
                        ),
                ),
            ))
            .attribute(AttributeSchema::new("discovery_url", AttributeType::String).computed())
            .attribute(AttributeSchema::new("workspace_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn id_format(&self) -> ResourceIdFormat {
        MACHINE_LEARNING_WORKSPACE
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(30, 5, 30, 30)
    }
}

fn workspace_name() -> AttributeType {
    AttributeType::Custom {
        name: "WorkspaceName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => {
                if WORKSPACE_NAME.is_match(s) {
                    Ok(())
                } else {
                    Err(format!(
                        "name {:?} must be 3 to 33 characters, start with a letter or digit and \
                         contain only letters, digits, underscores and hyphens",
                        s
                    ))
                }
            }
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Build the API model from prepared attributes
///
/// `previous` holds the attributes last read from the API, when updating.
fn expand(
    attributes: &HashMap<String, Value>,
    previous: Option<&HashMap<String, Value>>,
) -> ProviderResult<Workspace> {
    let attrs = Attributes(attributes);

    let identity_block = attrs
        .get_block("identity")
        .ok_or_else(|| ProviderError::validation("`identity` must be set"))?;
    let identity = identity::expand(&identity_block)
        .map_err(|e| ProviderError::validation(format!("expanding `identity`: {}", e)))?;

    let public_network_access = attrs.get_bool_or("public_network_access_enabled", false);
    let serverless_compute = expand_serverless_compute(&attrs, previous, public_network_access)?;

    let kind = attrs.get_string("kind").unwrap_or(KIND_DEFAULT).to_string();
    let feature_store = attrs.get_block("feature_store").map(|block| expand_feature_store(&block));
    let feature_store_settings = if kind.eq_ignore_ascii_case(KIND_DEFAULT) {
        if feature_store.is_some() {
            return Err(ProviderError::validation(
                "`feature_store` can only be set when `kind` is `FeatureStore`",
            ));
        }
        None
    } else {
        if feature_store.is_none() {
            return Err(ProviderError::validation(
                "`feature_store` can not be empty when `kind` is `FeatureStore`",
            ));
        }
        feature_store
    };

    let optional = |key: &str| attrs.get_string(key).map(str::to_string);
    let sku_name = attrs.get_string("sku_name").unwrap_or("Basic").to_string();

    Ok(Workspace {
        location: Some(normalize_location(&required_string(&attrs, "location")?)),
        kind: Some(kind),
        sku: Some(Sku {
            name: sku_name.clone(),
            tier: Some(sku_name),
        }),
        identity: Some(identity),
        properties: Some(WorkspaceProperties {
            application_insights: Some(required_string(&attrs, "application_insights_id")?),
            key_vault: Some(required_string(&attrs, "key_vault_id")?),
            storage_account: Some(required_string(&attrs, "storage_account_id")?),
            container_registry: optional("container_registry_id"),
            description: optional("description"),
            friendly_name: optional("friendly_name"),
            hbi_workspace: attrs.get_bool("high_business_impact").filter(|v| *v),
            image_build_compute: optional("image_build_compute_name"),
            primary_user_assigned_identity: optional("primary_user_assigned_identity"),
            public_network_access: Some(
                if public_network_access {
                    PUBLIC_NETWORK_ACCESS_ENABLED
                } else {
                    PUBLIC_NETWORK_ACCESS_DISABLED
                }
                .to_string(),
            ),
            v1_legacy_mode: Some(attrs.get_bool_or("v1_legacy_mode_enabled", false)),
            encryption: attrs.get_block("encryption").map(|block| expand_encryption(&block)),
            managed_network: attrs
                .get_block("managed_network")
                .map(|block| ManagedNetworkSettings {
                    isolation_mode: block.get_string("isolation_mode").map(str::to_string),
                }),
            serverless_compute_settings: serverless_compute,
            feature_store_settings,
            discovery_url: None,
            workspace_id: None,
        }),
        tags: expand_tags(&attrs),
    })
}

fn expand_serverless_compute(
    attrs: &Attributes<'_>,
    previous: Option<&HashMap<String, Value>>,
    public_network_access: bool,
) -> ProviderResult<Option<ServerlessComputeSettings>> {
    let Some(block) = attrs.get_block("serverless_compute") else {
        return Ok(None);
    };

    let public_ip_enabled = block.get_bool_or("public_ip_enabled", false);
    let subnet_id = block.get_string("subnet_id").map(str::to_string);

    if subnet_id.is_none() {
        if !public_ip_enabled && !public_network_access {
            return Err(ProviderError::validation(
                "`public_ip_enabled` must be set to `true` if `subnet_id` is not set and \
                 `public_network_access_enabled` is `false`",
            ));
        }

        let was_enabled = previous
            .and_then(|p| Attributes(p).get_block("serverless_compute"))
            .is_some_and(|b| b.get_bool_or("public_ip_enabled", false));
        if was_enabled && !public_ip_enabled {
            return Err(ProviderError::validation(
                "updating `public_ip_enabled` from `true` to `false` is not supported when \
                 `subnet_id` is not set",
            ));
        }
    }

    Ok(Some(ServerlessComputeSettings {
        custom_subnet: subnet_id,
        no_public_ip: Some(!public_ip_enabled),
    }))
}

fn expand_feature_store(block: &Attributes<'_>) -> FeatureStoreSettings {
    FeatureStoreSettings {
        compute_runtime: block
            .get_string("computer_spark_runtime_version")
            .map(|version| ComputeRuntime {
                spark_runtime_version: Some(version.to_string()),
            }),
        offline_store_connection_name: block
            .get_string("offline_connection_name")
            .map(str::to_string),
        online_store_connection_name: block
            .get_string("online_connection_name")
            .map(str::to_string),
    }
}

fn expand_encryption(block: &Attributes<'_>) -> EncryptionProperty {
    EncryptionProperty {
        identity: Some(CmkIdentity {
            user_assigned_identity: block
                .get_string("user_assigned_identity_id")
                .map(str::to_string),
        }),
        key_vault_properties: EncryptionKeyVaultProperties {
            key_vault_arm_id: block.get_string("key_vault_id").unwrap_or_default().to_string(),
            key_identifier: block.get_string("key_id").unwrap_or_default().to_string(),
        },
        status: ENCRYPTION_ENABLED.to_string(),
    }
}

/// Convert the API model into attributes
///
/// Referenced IDs come back from the API in arbitrary casing and are
/// re-emitted canonically.
fn flatten(id: &ResourceId, model: &Workspace) -> ProviderResult<HashMap<String, Value>> {
    let mut attributes = HashMap::from([
        ("name".to_string(), Value::string(id.name())),
        (
            "resource_group_name".to_string(),
            Value::string(&id.resource_group),
        ),
        ("tags".to_string(), flatten_tags(model.tags.as_ref())),
        ("identity".to_string(), identity::flatten(model.identity.as_ref())?),
    ]);

    if let Some(location) = &model.location {
        attributes.insert(
            "location".to_string(),
            Value::string(normalize_location(location)),
        );
    }
    if let Some(sku) = &model.sku {
        attributes.insert("sku_name".to_string(), Value::string(&sku.name));
    }
    set_string(&mut attributes, "kind", model.kind.as_ref());

    let default_properties = WorkspaceProperties::default();
    let props = model.properties.as_ref().unwrap_or(&default_properties);

    let application_insights_id = match &props.application_insights {
        Some(raw) => canonicalize(&APPLICATION_INSIGHTS, raw).map_err(ProviderError::request)?,
        None => String::new(),
    };
    attributes.insert(
        "application_insights_id".to_string(),
        Value::string(application_insights_id),
    );
    if let Some(raw) = &props.key_vault {
        let key_vault_id = canonicalize(&KEY_VAULT, raw).map_err(ProviderError::request)?;
        attributes.insert("key_vault_id".to_string(), Value::string(key_vault_id));
    }

    set_string(&mut attributes, "storage_account_id", props.storage_account.as_ref());
    set_string(&mut attributes, "container_registry_id", props.container_registry.as_ref());
    set_string(&mut attributes, "description", props.description.as_ref());
    set_string(&mut attributes, "friendly_name", props.friendly_name.as_ref());
    set_string(&mut attributes, "image_build_compute_name", props.image_build_compute.as_ref());
    set_string(&mut attributes, "discovery_url", props.discovery_url.as_ref());
    set_string(
        &mut attributes,
        "primary_user_assigned_identity",
        props.primary_user_assigned_identity.as_ref(),
    );
    set_string(&mut attributes, "workspace_id", props.workspace_id.as_ref());

    if let Some(hbi) = props.hbi_workspace {
        attributes.insert("high_business_impact".to_string(), Value::Bool(hbi));
    }
    if let Some(v1_legacy_mode) = props.v1_legacy_mode {
        attributes.insert("v1_legacy_mode_enabled".to_string(), Value::Bool(v1_legacy_mode));
    }
    attributes.insert(
        "public_network_access_enabled".to_string(),
        Value::Bool(
            props
                .public_network_access
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(PUBLIC_NETWORK_ACCESS_ENABLED)),
        ),
    );

    attributes.insert(
        "managed_network".to_string(),
        flatten_block(props.managed_network.as_ref(), |network| {
            let mut block = HashMap::new();
            set_string(&mut block, "isolation_mode", network.isolation_mode.as_ref());
            block
        }),
    );
    attributes.insert(
        "serverless_compute".to_string(),
        flatten_block(props.serverless_compute_settings.as_ref(), |settings| {
            let mut block = HashMap::new();
            set_string(&mut block, "subnet_id", settings.custom_subnet.as_ref());
            if let Some(no_public_ip) = settings.no_public_ip {
                block.insert("public_ip_enabled".to_string(), Value::Bool(!no_public_ip));
            }
            block
        }),
    );
    attributes.insert(
        "feature_store".to_string(),
        flatten_block(props.feature_store_settings.as_ref(), flatten_feature_store),
    );
    attributes.insert(
        "encryption".to_string(),
        flatten_encryption(props.encryption.as_ref())?,
    );

    Ok(attributes)
}

fn flatten_block<T>(value: Option<&T>, f: impl FnOnce(&T) -> HashMap<String, Value>) -> Value {
    match value {
        Some(value) => Value::block(f(value)),
        None => Value::List(Vec::new()),
    }
}

fn flatten_feature_store(settings: &FeatureStoreSettings) -> HashMap<String, Value> {
    let spark_runtime_version = settings
        .compute_runtime
        .as_ref()
        .and_then(|r| r.spark_runtime_version.clone())
        .unwrap_or_default();
    HashMap::from([
        (
            "computer_spark_runtime_version".to_string(),
            Value::string(spark_runtime_version),
        ),
        (
            "offline_connection_name".to_string(),
            Value::string(settings.offline_store_connection_name.clone().unwrap_or_default()),
        ),
        (
            "online_connection_name".to_string(),
            Value::string(settings.online_store_connection_name.clone().unwrap_or_default()),
        ),
    ])
}

/// Encryption is only reported while it is enabled
fn flatten_encryption(encryption: Option<&EncryptionProperty>) -> ProviderResult<Value> {
    let Some(encryption) = encryption.filter(|e| e.status == ENCRYPTION_ENABLED) else {
        return Ok(Value::List(Vec::new()));
    };

    let mut block = HashMap::from([
        (
            "key_vault_id".to_string(),
            Value::string(&encryption.key_vault_properties.key_vault_arm_id),
        ),
        (
            "key_id".to_string(),
            Value::string(&encryption.key_vault_properties.key_identifier),
        ),
    ]);
    if let Some(raw) = encryption
        .identity
        .as_ref()
        .and_then(|i| i.user_assigned_identity.as_ref())
        .filter(|raw| !raw.is_empty())
    {
        let user_assigned_identity_id = canonicalize(&USER_ASSIGNED_IDENTITY, raw).map_err(|e| {
            ProviderError::request(format!("parsing userAssignedIdentityId {:?}: {}", raw, e))
        })?;
        block.insert(
            "user_assigned_identity_id".to_string(),
            Value::string(user_assigned_identity_id),
        );
    }
    Ok(Value::block(block))
}

impl AzurermProvider {
    fn workspace_reconciler(&self) -> Reconciler<ArmResource<Workspace>> {
        let mut api = self.api::<Workspace>(API_VERSION);
        if self
            .config()
            .features
            .machine_learning
            .purge_soft_deleted_workspace_on_destroy
        {
            api = api.with_delete_query("forceToPurge", "true");
        }
        self.reconciler(api)
    }

    pub(crate) async fn read_machine_learning_workspace(&self, id: &str) -> ProviderResult<State> {
        let id = MACHINE_LEARNING_WORKSPACE.parse(id)?;
        let timeout = MachineLearningWorkspaceType.timeouts().read;
        with_read_timeout(timeout, &id, self.fetch_machine_learning_workspace(&id)).await
    }

    async fn fetch_machine_learning_workspace(&self, id: &ResourceId) -> ProviderResult<State> {
        let Lookup::Found(model) = self.workspace_reconciler().fetch(id).await? else {
            log::debug!("{} was not found", id);
            return Ok(State::not_found(TYPE_NAME));
        };

        let attributes = flatten(id, &model).map_err(|e| e.context("flattening", id))?;
        Ok(State::existing(TYPE_NAME, id.to_string(), attributes))
    }

    pub(crate) async fn create_machine_learning_workspace(
        &self,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let schema = MachineLearningWorkspaceType.schema();
        let attributes = prepare(&schema, resource)?;
        let timeouts = MachineLearningWorkspaceType.timeouts().merge(&resource.timeouts);

        let attrs = Attributes(&attributes);
        let id = MACHINE_LEARNING_WORKSPACE.build(
            self.subscription_id(),
            &required_string(&attrs, "resource_group_name")?,
            &[&required_string(&attrs, "name")?],
        );

        let reconciler = self.workspace_reconciler();
        let existing = with_read_timeout(timeouts.read, &id, reconciler.fetch(&id))
            .await
            .map_err(|e| e.context("checking for presence of existing", &id))?;
        if existing.is_found() {
            return Err(ProviderError::already_exists(TYPE_NAME, &id));
        }

        let model = expand(&attributes, None)?;
        reconciler.apply(&id, &model, timeouts.create).await?;
        log::info!("Created {}", id);

        self.require_machine_learning_workspace(&id, timeouts.read).await
    }

    pub(crate) async fn update_machine_learning_workspace(
        &self,
        id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let id = MACHINE_LEARNING_WORKSPACE.parse(id)?;
        let schema = MachineLearningWorkspaceType.schema();
        let attributes = prepare(&schema, to)?;
        check_in_place(&schema, &from.attributes, &attributes)?;
        let timeouts = MachineLearningWorkspaceType.timeouts().merge(&to.timeouts);

        let model = expand(&attributes, Some(&from.attributes))?;
        self.workspace_reconciler()
            .apply(&id, &model, timeouts.update)
            .await?;
        log::info!("Updated {}", id);

        self.require_machine_learning_workspace(&id, timeouts.read).await
    }

    pub(crate) async fn delete_machine_learning_workspace(
        &self,
        id: &str,
        timeout: Option<Duration>,
    ) -> ProviderResult<()> {
        let id = MACHINE_LEARNING_WORKSPACE.parse(id)?;
        let timeout = timeout.unwrap_or(MachineLearningWorkspaceType.timeouts().delete);

        self.workspace_reconciler()
            .delete(&id, timeout, DeleteConfirmation::OperationStatus)
            .await?;
        log::info!("Deleted {}", id);
        Ok(())
    }

    async fn require_machine_learning_workspace(
        &self,
        id: &ResourceId,
        timeout: Duration,
    ) -> ProviderResult<State> {
        let state =
            with_read_timeout(timeout, id, self.fetch_machine_learning_workspace(id)).await?;
        if !state.exists {
            return Err(ProviderError::request("resource disappeared after it was written")
                .context("retrieving", id));
        }
        Ok(state)
    }
}
