//! Carina Azure Resource Manager Provider
//!
//! ## Module Structure
//!
//! - `client` - ARM REST client and the `RemoteApi` adapter
//! - `config` - Provider configuration
//! - `identity` - Managed service identity mapping
//! - `ids` - Resource ID formats
//! - `provider` - AzurermProvider implementation
//! - `resources` - Resource type definitions
//! - `utils` - Helper functions for value normalization

pub mod client;
pub mod config;
pub mod identity;
pub mod ids;
pub mod provider;
pub mod resources;
pub mod utils;

// Re-export main types
pub use config::{ConfigError, ProviderConfig};
pub use provider::AzurermProvider;

use std::time::Duration;

use carina_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Resource, State};

use resources::{machine_learning_workspace, relay_namespace, resource_types};

fn unknown_type(resource_type: &str) -> ProviderError {
    ProviderError::validation(format!("Unknown resource type: {}", resource_type))
}

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AzurermProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(&self, resource_type: &str, id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let resource_type = resource_type.to_string();
        let id = id.to_string();
        Box::pin(async move {
            match resource_type.as_str() {
                machine_learning_workspace::TYPE_NAME => {
                    self.read_machine_learning_workspace(&id).await
                }
                relay_namespace::TYPE_NAME => self.read_relay_namespace(&id).await,
                _ => Err(unknown_type(&resource_type).for_resource(id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.resource_type.as_str() {
                machine_learning_workspace::TYPE_NAME => {
                    self.create_machine_learning_workspace(&resource).await
                }
                relay_namespace::TYPE_NAME => self.create_relay_namespace(&resource).await,
                _ => Err(unknown_type(&resource.resource_type)),
            }
        })
    }

    fn update(
        &self,
        id: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match to.resource_type.as_str() {
                machine_learning_workspace::TYPE_NAME => {
                    self.update_machine_learning_workspace(&id, &from, &to).await
                }
                relay_namespace::TYPE_NAME => self.update_relay_namespace(&id, &from, &to).await,
                _ => Err(unknown_type(&to.resource_type).for_resource(id)),
            }
        })
    }

    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let resource_type = resource_type.to_string();
        let id = id.to_string();
        Box::pin(async move {
            match resource_type.as_str() {
                machine_learning_workspace::TYPE_NAME => {
                    self.delete_machine_learning_workspace(&id, timeout).await
                }
                relay_namespace::TYPE_NAME => self.delete_relay_namespace(&id, timeout).await,
                _ => Err(unknown_type(&resource_type).for_resource(id)),
            }
        })
    }

    fn import(&self, resource_type: &str, id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let resource_type = resource_type.to_string();
        let id = id.to_string();
        Box::pin(async move {
            let Some(definition) = resources::find(&resource_type) else {
                return Err(unknown_type(&resource_type).for_resource(id));
            };
            let canonical = definition
                .id_format()
                .parse_insensitively(&id)
                .map_err(|e| ProviderError::from(e).context("importing", &id))?
                .to_string();

            let state = self.read(&resource_type, &canonical).await?;
            if !state.exists {
                return Err(ProviderError::request(
                    "cannot import a non-existent remote object",
                )
                .context("importing", &canonical));
            }
            log::info!("Imported {}", canonical);
            Ok(state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::provider::ErrorKind;
    use carina_core::timeouts::Timeouts;

    fn provider() -> AzurermProvider {
        AzurermProvider::new(ProviderConfig::new("sub").with_endpoint("http://127.0.0.1:9")).unwrap()
    }

    #[test]
    fn resource_types_carry_their_timeouts() {
        let types = provider().resource_types();
        let timeouts: Vec<Timeouts> = types.iter().map(|t| t.timeouts()).collect();
        assert_eq!(timeouts[0], Timeouts::minutes(30, 5, 30, 30));
        assert_eq!(timeouts[1], Timeouts::minutes(30, 5, 30, 60));
    }

    #[tokio::test]
    async fn unknown_resource_types_are_rejected() {
        let err = provider()
            .read("azurerm_storage_account", "/subscriptions/s")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.resource_id.as_deref(), Some("/subscriptions/s"));
    }

    #[tokio::test]
    async fn malformed_ids_fail_before_any_request() {
        let err = provider()
            .delete(relay_namespace::TYPE_NAME, "not-an-id", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidId);
    }
}
