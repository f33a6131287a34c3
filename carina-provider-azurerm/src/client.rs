//! Azure Resource Manager REST client
//!
//! Thin wrapper over `reqwest` that maps ARM status codes onto the
//! reconciler's vocabulary: 404 on read becomes `Lookup::NotFound`, and
//! writes answering with `Azure-AsyncOperation` or `Location` headers become
//! pending operation handles.

use std::marker::PhantomData;
use std::sync::Arc;

use carina_core::id::ResourceId;
use carina_core::lifecycle::{
    Lookup, OperationHandle, OperationHandleKind, OperationStatus, RemoteApi, Submission,
};
use carina_core::provider::{BoxFuture, ProviderError, ProviderResult};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ProviderConfig;

const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";
const USER_AGENT: &str = concat!("carina-provider-azurerm/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

impl ErrorDetail {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (Some(code), None) => code.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Body of an `Azure-AsyncOperation` status document
#[derive(Debug, Deserialize)]
struct OperationDocument {
    status: String,
    error: Option<ErrorDetail>,
}

/// Resource body as far as its provisioning state is concerned
#[derive(Debug, Deserialize)]
struct ProvisioningDocument {
    properties: Option<ProvisioningProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    provisioning_state: Option<String>,
}

impl ProvisioningDocument {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties.as_ref()?.provisioning_state.as_deref()
    }
}

/// Resource Manager client shared by all resources of a provider
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl ArmClient {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ProviderError::request(format!("building HTTP client: {}", e)).with_cause(e)
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resource_url(&self, id: &ResourceId) -> String {
        format!("{}{}", self.endpoint, id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request
            .send()
            .await
            .map_err(|e| ProviderError::request(format!("sending request: {}", e)).with_cause(e))
    }

    /// Read a resource; 404 is reported as `Lookup::NotFound`
    pub async fn get_json<M: DeserializeOwned>(
        &self,
        id: &ResourceId,
        api_version: &str,
    ) -> ProviderResult<Lookup<M>> {
        let url = self.resource_url(id);
        log::debug!("GET {}", url);
        let response = self
            .send(self.http.get(&url).query(&[("api-version", api_version)]))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        decode(response).await.map(Lookup::Found)
    }

    /// Create or replace a resource
    ///
    /// A write accepted without an operation header whose body still reports a
    /// non-terminal `provisioningState` is pending on the resource itself.
    pub async fn put_json<M: Serialize + ?Sized>(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: &M,
    ) -> ProviderResult<Submission> {
        let url = self.resource_url(id);
        log::debug!("PUT {}", url);
        let response = self
            .send(
                self.http
                    .put(&url)
                    .query(&[("api-version", api_version)])
                    .json(body),
            )
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let submission = submission_from(response.status(), response.headers());
        if let Submission::Pending(_) = submission {
            return Ok(submission);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::request(format!("reading response: {}", e)).with_cause(e))?;
        let state = serde_json::from_str::<ProvisioningDocument>(&body)
            .ok()
            .and_then(|document| document.provisioning_state().map(str::to_string));
        match state {
            Some(state) if parse_status(&state, None) == OperationStatus::InProgress => {
                log::debug!("{} is still {}", id, state);
                Ok(Submission::Pending(OperationHandle {
                    kind: OperationHandleKind::ProvisioningState,
                    url: format!("{}?api-version={}", url, api_version),
                }))
            }
            _ => Ok(Submission::Completed),
        }
    }

    /// Delete a resource; a resource that is already gone counts as deleted
    pub async fn delete(
        &self,
        id: &ResourceId,
        api_version: &str,
        query: &[(String, String)],
    ) -> ProviderResult<Submission> {
        let url = self.resource_url(id);
        log::debug!("DELETE {}", url);
        let response = self
            .send(
                self.http
                    .delete(&url)
                    .query(&[("api-version", api_version)])
                    .query(query),
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("{} was already deleted", id);
            return Ok(Submission::Completed);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(submission_from(response.status(), response.headers()))
    }

    /// Invoke a POST action on a resource (e.g. `listKeys`)
    pub async fn post_action<R: DeserializeOwned>(
        &self,
        id: &ResourceId,
        action: &str,
        api_version: &str,
    ) -> ProviderResult<R> {
        let url = format!("{}/{}", self.resource_url(id), action);
        log::debug!("POST {}", url);
        let response = self
            .send(self.http.post(&url).query(&[("api-version", api_version)]))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        decode(response).await
    }

    /// Poll a long-running operation once
    pub async fn operation_status(
        &self,
        handle: &OperationHandle,
    ) -> ProviderResult<OperationStatus> {
        log::debug!("Polling operation {}", handle.url);
        let response = self.send(self.http.get(&handle.url)).await?;

        match handle.kind {
            OperationHandleKind::AsyncOperation => {
                if !response.status().is_success() {
                    return Err(error_from_response(response).await);
                }
                let document: OperationDocument = decode(response).await?;
                Ok(parse_status(&document.status, document.error.as_ref()))
            }
            OperationHandleKind::ProvisioningState => {
                if !response.status().is_success() {
                    return Err(error_from_response(response).await);
                }
                let document: ProvisioningDocument = decode(response).await?;
                Ok(document
                    .provisioning_state()
                    .map_or(OperationStatus::Succeeded, |state| parse_status(state, None)))
            }
            OperationHandleKind::Location => {
                let status = response.status();
                if status == StatusCode::ACCEPTED {
                    Ok(OperationStatus::InProgress)
                } else if status.is_success() {
                    Ok(OperationStatus::Succeeded)
                } else {
                    Ok(OperationStatus::Failed(
                        error_from_response(response).await.message,
                    ))
                }
            }
        }
    }
}

fn submission_from(status: StatusCode, headers: &HeaderMap) -> Submission {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(url) = header(AZURE_ASYNC_OPERATION) {
        return Submission::Pending(OperationHandle {
            kind: OperationHandleKind::AsyncOperation,
            url,
        });
    }
    if status == StatusCode::ACCEPTED
        && let Some(url) = header(LOCATION.as_str())
    {
        return Submission::Pending(OperationHandle {
            kind: OperationHandleKind::Location,
            url,
        });
    }
    Submission::Completed
}

/// Map an operation status or provisioning state name; unknown names are in progress
fn parse_status(status: &str, error: Option<&ErrorDetail>) -> OperationStatus {
    if status.eq_ignore_ascii_case("Succeeded") {
        OperationStatus::Succeeded
    } else if status.eq_ignore_ascii_case("Failed") {
        OperationStatus::Failed(
            error
                .map(ErrorDetail::describe)
                .unwrap_or_else(|| "operation failed without details".to_string()),
        )
    } else if status.eq_ignore_ascii_case("Canceled") || status.eq_ignore_ascii_case("Cancelled")
    {
        OperationStatus::Canceled
    } else {
        OperationStatus::InProgress
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::request(format!("decoding response: {}", e)).with_cause(e))
}

async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|r| r.error)
        .map(|e| e.describe());

    let message = match detail {
        Some(detail) => format!("unexpected status {} with error: {}", status.as_u16(), detail),
        None if body.is_empty() => format!("unexpected status {}", status.as_u16()),
        None => format!("unexpected status {} with response: {}", status.as_u16(), body),
    };
    ProviderError::request(message).with_status(status.as_u16())
}

/// `RemoteApi` over one ARM resource type with a typed model
pub struct ArmResource<M> {
    client: Arc<ArmClient>,
    api_version: &'static str,
    delete_query: Vec<(String, String)>,
    _model: PhantomData<fn() -> M>,
}

impl<M> ArmResource<M> {
    pub fn new(client: Arc<ArmClient>, api_version: &'static str) -> Self {
        Self {
            client,
            api_version,
            delete_query: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Extra query parameter sent with the delete request
    pub fn with_delete_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.delete_query.push((key.into(), value.into()));
        self
    }

    pub fn client(&self) -> &ArmClient {
        &self.client
    }
}

impl<M> RemoteApi for ArmResource<M>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Id = ResourceId;
    type Model = M;

    fn get<'a>(&'a self, id: &'a ResourceId) -> BoxFuture<'a, ProviderResult<Lookup<M>>> {
        Box::pin(self.client.get_json(id, self.api_version))
    }

    fn create_or_update<'a>(
        &'a self,
        id: &'a ResourceId,
        model: &'a M,
    ) -> BoxFuture<'a, ProviderResult<Submission>> {
        Box::pin(self.client.put_json(id, self.api_version, model))
    }

    fn delete<'a>(&'a self, id: &'a ResourceId) -> BoxFuture<'a, ProviderResult<Submission>> {
        Box::pin(self.client.delete(id, self.api_version, &self.delete_query))
    }

    fn operation_status<'a>(
        &'a self,
        handle: &'a OperationHandle,
    ) -> BoxFuture<'a, ProviderResult<OperationStatus>> {
        Box::pin(self.client.operation_status(handle))
    }
}
