//! Azure Resource Manager Provider implementation
//!
//! Owns the shared ARM client and the clock every reconciler polls with.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use carina_core::clock::{Clock, SystemClock};
use carina_core::lifecycle::Reconciler;
use carina_core::provider::{ProviderError, ProviderResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::{ArmClient, ArmResource};
use crate::config::ProviderConfig;

/// Azure Resource Manager Provider
pub struct AzurermProvider {
    client: Arc<ArmClient>,
    clock: Arc<dyn Clock>,
    config: ProviderConfig,
}

impl AzurermProvider {
    /// Create a provider from a validated configuration
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::validation(e.to_string()).with_cause(e))?;
        let client = ArmClient::new(&config)?;

        Ok(Self {
            client: Arc::new(client),
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Replace the clock used for polling
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ArmClient> {
        &self.client
    }

    /// ARM API of one resource type at the given API version
    pub fn api<M>(&self, api_version: &'static str) -> ArmResource<M> {
        ArmResource::new(self.client.clone(), api_version)
    }

    /// Reconciler over an API, with poll intervals from the configuration
    pub fn reconciler<M>(&self, api: ArmResource<M>) -> Reconciler<ArmResource<M>>
    where
        M: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Reconciler::new(api, self.clock.clone())
            .with_operation_poll_interval(self.config.operation_poll_interval())
            .with_delete_probe_interval(self.config.delete_probe_interval())
    }
}

/// Bound a read by its timeout
pub async fn with_read_timeout<T>(
    timeout: Duration,
    id: impl std::fmt::Display,
    read: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<T> {
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout(format!(
            "reading {}: timed out after {:?}",
            id, timeout
        ))
        .for_resource(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::provider::ErrorKind;

    #[test]
    fn new_rejects_missing_subscription() {
        let err = AzurermProvider::new(ProviderConfig::default()).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn reconciler_takes_probe_floor_from_config() {
        let config = ProviderConfig {
            delete_probe_interval_secs: 3,
            ..ProviderConfig::new("s").with_endpoint("http://localhost")
        };
        let provider = AzurermProvider::new(config).unwrap();
        assert_eq!(provider.subscription_id(), "s");
        assert_eq!(provider.config().delete_probe_interval(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn read_timeout_is_reported_as_timeout() {
        let err = with_read_timeout(Duration::from_millis(10), "id", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ProviderError>(())
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.resource_id.as_deref(), Some("id"));
    }
}
