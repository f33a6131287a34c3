//! Provider - Trait abstracting resource operations
//!
//! A Provider defines lifecycle operations for the resource types of one
//! infrastructure platform. It converts desired state into API calls and API
//! responses back into observed state.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::id::{IdParseError, ResourceIdFormat};
use crate::resource::{Resource, State};
use crate::schema::{ResourceSchema, TypeError};
use crate::timeouts::Timeouts;

/// Category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The API rejected or failed a request
    Request,
    /// A bounded wait ended before reaching a terminal state
    Timeout,
    /// The desired state is not acceptable
    Validation,
    /// Create found a resource that should be imported instead
    AlreadyExists,
    /// A resource ID string could not be parsed
    InvalidId,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    /// Canonical ID of the resource involved, if known
    pub resource_id: Option<String>,
    /// HTTP status returned by the API, if any
    pub status: Option<u16>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            status: None,
            cause: None,
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn already_exists(resource_type: &str, id: impl std::fmt::Display) -> Self {
        let id = id.to_string();
        Self::new(
            ErrorKind::AlreadyExists,
            format!(
                "A resource with the ID {:?} already exists - to be managed it needs to be imported. \
                 Please see the documentation for {:?} for more information.",
                id, resource_type
            ),
        )
        .for_resource(id)
    }

    pub fn for_resource(mut self, id: impl std::fmt::Display) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Prefix the message with the operation phase and the resource it concerns
    ///
    /// e.g. `deleting /subscriptions/.../namespaces/example: <message>`
    pub fn context(mut self, phase: &str, id: impl std::fmt::Display) -> Self {
        let id = id.to_string();
        self.message = format!("{} {}: {}", phase, id, self.message);
        if self.resource_id.is_none() {
            self.resource_id = Some(id);
        }
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

impl From<IdParseError> for ProviderError {
    fn from(err: IdParseError) -> Self {
        Self::new(ErrorKind::InvalidId, err.to_string()).with_cause(err)
    }
}

impl From<Vec<TypeError>> for ProviderError {
    fn from(errors: Vec<TypeError>) -> Self {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::validation(message)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "azurerm_relay_namespace")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;

    /// Shape of IDs accepted on import
    fn id_format(&self) -> ResourceIdFormat;

    /// Default timeouts for each lifecycle operation
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects. Resources are
/// addressed by their canonical ID string once created.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "azurerm")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(&self, resource_type: &str, id: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Fails with `ErrorKind::AlreadyExists` if the resource is already present.
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(&self, id: &str, from: &State, to: &Resource)
    -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource and wait until it is gone
    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Bring an existing resource under management
    ///
    /// The ID is validated against the resource type's ID format before reading.
    fn import(&self, resource_type: &str, id: &str) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(&self, resource_type: &str, id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(resource_type, id)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, from, to)
    }

    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(resource_type, id, timeout)
    }

    fn import(&self, resource_type: &str, id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(resource_type, id)
    }
}
