//! azurerm_relay_namespace
//!
//! Deletion cannot be tracked through the delete operation: its poller never
//! reports a namespace that has gone 404 as finished. Completion is confirmed by
//! probing the namespace until a read reports it missing.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use carina_core::id::{ResourceId, ResourceIdFormat};
use carina_core::lifecycle::{DeleteConfirmation, Lookup};
use carina_core::provider::{ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Attributes, Resource, State, Value};
use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use carina_core::timeouts::Timeouts;
use serde::{Deserialize, Serialize};

use super::{check_in_place, prepare, required_string};
use crate::ids::{RELAY_AUTHORIZATION_RULE, RELAY_NAMESPACE};
use crate::provider::{AzurermProvider, with_read_timeout};
use crate::utils::{expand_tags, flatten_tags, normalize_location, set_string};

pub const TYPE_NAME: &str = "azurerm_relay_namespace";
const API_VERSION: &str = "2017-04-01";
const ROOT_AUTHORIZATION_RULE: &str = "RootManageSharedAccessKey";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayNamespace {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub properties: Option<RelayNamespaceProperties>,
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
pub struct RelayNamespaceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_bus_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeys {
    pub primary_connection_string: Option<String>,
    pub secondary_connection_string: Option<String>,
    pub primary_key: Option<String>,
    pub secondary_key: Option<String>,
}

pub struct RelayNamespaceType;

impl ResourceType for RelayNamespaceType {
    fn name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_description("Relay Namespace")
            .attribute(
                AttributeSchema::new("name", namespace_name())
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
            .attribute(AttributeSchema::new("sku_name", types::one_of(&["Standard"])).required())
            .attribute(AttributeSchema::new("metric_id", AttributeType::String).computed())
            .attribute(secret("primary_connection_string"))
            .attribute(secret("secondary_connection_string"))
            .attribute(secret("primary_key"))
            .attribute(secret("secondary_key"))
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn id_format(&self) -> ResourceIdFormat {
        RELAY_NAMESPACE
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(30, 5, 30, 60)
    }
}

fn secret(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
        .computed()
        .sensitive()
}

fn namespace_name() -> AttributeType {
    AttributeType::Custom {
        name: "RelayNamespaceName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if (6..=50).contains(&s.chars().count()) => Ok(()),
            Value::String(s) => Err(format!(
                "name {:?} must be between 6 and 50 characters long",
                s
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}

fn expand(attributes: &HashMap<String, Value>) -> ProviderResult<RelayNamespace> {
    let attrs = Attributes(attributes);
    let sku_name = required_string(&attrs, "sku_name")?;

    Ok(RelayNamespace {
        location: normalize_location(&required_string(&attrs, "location")?),
        sku: Some(Sku {
            name: sku_name.clone(),
            tier: Some(sku_name),
        }),
        properties: Some(RelayNamespaceProperties::default()),
        tags: expand_tags(&attrs),
    })
}

fn flatten(id: &ResourceId, model: &RelayNamespace, keys: &AccessKeys) -> HashMap<String, Value> {
    let mut attributes = HashMap::from([
        ("name".to_string(), Value::string(id.name())),
        (
            "resource_group_name".to_string(),
            Value::string(&id.resource_group),
        ),
        (
            "location".to_string(),
            Value::string(normalize_location(&model.location)),
        ),
        ("tags".to_string(), flatten_tags(model.tags.as_ref())),
    ]);

    if let Some(sku) = &model.sku {
        attributes.insert("sku_name".to_string(), Value::string(&sku.name));
    }
    let metric_id = model.properties.as_ref().and_then(|p| p.metric_id.as_ref());
    set_string(&mut attributes, "metric_id", metric_id);

    set_string(
        &mut attributes,
        "primary_connection_string",
        keys.primary_connection_string.as_ref(),
    );
    set_string(
        &mut attributes,
        "secondary_connection_string",
        keys.secondary_connection_string.as_ref(),
    );
    set_string(&mut attributes, "primary_key", keys.primary_key.as_ref());
    set_string(&mut attributes, "secondary_key", keys.secondary_key.as_ref());

    attributes
}

impl AzurermProvider {
    pub(crate) async fn read_relay_namespace(&self, id: &str) -> ProviderResult<State> {
        let id = RELAY_NAMESPACE.parse(id)?;
        let timeout = RelayNamespaceType.timeouts().read;
        with_read_timeout(timeout, &id, self.fetch_relay_namespace(&id)).await
    }

    async fn fetch_relay_namespace(&self, id: &ResourceId) -> ProviderResult<State> {
        let reconciler = self.reconciler(self.api::<RelayNamespace>(API_VERSION));
        let Lookup::Found(model) = reconciler.fetch(id).await? else {
            log::debug!("{} was not found", id);
            return Ok(State::not_found(TYPE_NAME));
        };

        let rule = RELAY_AUTHORIZATION_RULE.build(
            &id.subscription_id,
            &id.resource_group,
            &[id.name(), ROOT_AUTHORIZATION_RULE],
        );
        let keys: AccessKeys = self
            .client()
            .post_action(&rule, "listKeys", API_VERSION)
            .await
            .map_err(|e| e.context("listing keys for", id))?;

        Ok(State::existing(TYPE_NAME, id.to_string(), flatten(id, &model, &keys)))
    }

    pub(crate) async fn create_relay_namespace(&self, resource: &Resource) -> ProviderResult<State> {
        let schema = RelayNamespaceType.schema();
        let attributes = prepare(&schema, resource)?;
        let timeouts = RelayNamespaceType.timeouts().merge(&resource.timeouts);

        let attrs = Attributes(&attributes);
        let id = RELAY_NAMESPACE.build(
            self.subscription_id(),
            &required_string(&attrs, "resource_group_name")?,
            &[&required_string(&attrs, "name")?],
        );

        let reconciler = self.reconciler(self.api::<RelayNamespace>(API_VERSION));
        let existing = with_read_timeout(timeouts.read, &id, reconciler.fetch(&id))
            .await
            .map_err(|e| e.context("checking for presence of existing", &id))?;
        if existing.is_found() {
            return Err(ProviderError::already_exists(TYPE_NAME, &id));
        }

        let model = expand(&attributes)?;
        reconciler.apply(&id, &model, timeouts.create).await?;
        log::info!("Created {}", id);

        self.require_relay_namespace(&id, timeouts.read).await
    }

    pub(crate) async fn update_relay_namespace(
        &self,
        id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let id = RELAY_NAMESPACE.parse(id)?;
        let schema = RelayNamespaceType.schema();
        let attributes = prepare(&schema, to)?;
        check_in_place(&schema, &from.attributes, &attributes)?;
        let timeouts = RelayNamespaceType.timeouts().merge(&to.timeouts);

        let model = expand(&attributes)?;
        let reconciler = self.reconciler(self.api::<RelayNamespace>(API_VERSION));
        reconciler.apply(&id, &model, timeouts.update).await?;
        log::info!("Updated {}", id);

        self.require_relay_namespace(&id, timeouts.read).await
    }

    pub(crate) async fn delete_relay_namespace(
        &self,
        id: &str,
        timeout: Option<Duration>,
    ) -> ProviderResult<()> {
        let id = RELAY_NAMESPACE.parse(id)?;
        let timeout = timeout.unwrap_or(RelayNamespaceType.timeouts().delete);

        let reconciler = self.reconciler(self.api::<RelayNamespace>(API_VERSION));
        reconciler
            .delete(&id, timeout, DeleteConfirmation::ExistenceProbe)
            .await?;
        log::info!("Deleted {}", id);
        Ok(())
    }

    async fn require_relay_namespace(
        &self,
        id: &ResourceId,
        timeout: Duration,
    ) -> ProviderResult<State> {
        let state = with_read_timeout(timeout, id, self.fetch_relay_namespace(id)).await?;
        if !state.exists {
            return Err(ProviderError::request("resource disappeared after it was written")
                .context("retrieving", id));
        }
        Ok(state)
    }
}
