//! Provider configuration
//!
//! Loaded from an optional JSON file and overridden from the environment:
//!
//! - `ARM_SUBSCRIPTION_ID`
//! - `ARM_ACCESS_TOKEN`
//! - `ARM_ENDPOINT`

use std::path::{Path, PathBuf};
use std::time::Duration;

use carina_core::lifecycle::{DEFAULT_DELETE_PROBE_INTERVAL, MIN_OPERATION_POLL_INTERVAL};
use carina_core::schema::validate_http_url;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Errors raised while loading provider configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("subscription_id is not set (use the config file or ARM_SUBSCRIPTION_ID)")]
    MissingSubscription,

    #[error("Invalid endpoint '{0}': expected an http or https URL")]
    InvalidEndpoint(String),
}

/// Feature toggles that change resource behavior
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Features {
    pub machine_learning: MachineLearningFeatures,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MachineLearningFeatures {
    /// Purge soft-deleted workspaces instead of leaving them recoverable
    pub purge_soft_deleted_workspace_on_destroy: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    pub subscription_id: String,
    /// Resource Manager base URL
    pub endpoint: String,
    /// Bearer token sent with every request
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub operation_poll_interval_secs: u64,
    pub delete_probe_interval_secs: u64,
    pub features: Features,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            request_timeout_secs: 60,
            operation_poll_interval_secs: 10,
            delete_probe_interval_secs: DEFAULT_DELETE_PROBE_INTERVAL.as_secs(),
            features: Features::default(),
        }
    }
}

impl ProviderConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Read configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override values from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Override values from a variable lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(subscription_id) = non_empty("ARM_SUBSCRIPTION_ID") {
            self.subscription_id = subscription_id;
        }
        if let Some(token) = non_empty("ARM_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(endpoint) = non_empty("ARM_ENDPOINT") {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_id.is_empty() {
            return Err(ConfigError::MissingSubscription);
        }
        validate_http_url(&self.endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(self.endpoint.clone()))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn operation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.operation_poll_interval_secs).max(MIN_OPERATION_POLL_INTERVAL)
    }

    /// Interval between existence probes; never below the 15 second floor
    pub fn delete_probe_interval(&self) -> Duration {
        Duration::from_secs(self.delete_probe_interval_secs).max(DEFAULT_DELETE_PROBE_INTERVAL)
    }
}
