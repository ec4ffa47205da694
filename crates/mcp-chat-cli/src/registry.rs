//! HTTP client for the backend's server registry.
//!
//! Endpoints:
//! - `GET /api/servers` lists servers and their tools
//! - `POST /api/servers` connects a new server
//! - `DELETE /api/servers/{name}` disconnects a server
//! - `GET /` reports backend health

use std::time::Duration;

use async_trait::async_trait;
use mcp_chat_core::{ListServersResponse, ServerDescriptor};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail, or a generic description.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The base URL cannot carry a request path.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// How the backend should launch a server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLaunch {
    /// Executable to run.
    pub command: String,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Acknowledgement returned by add and remove.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerAck {
    /// `connected` or `disconnected`.
    pub status: String,
    /// Server the operation applied to.
    pub server: String,
}

/// Backend health report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    /// `ok` when the backend is up.
    pub status: String,
    /// Backend banner.
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
struct AddServerRequest<'a> {
    name: &'a str,
    config: &'a ServerLaunch,
}

/// FastAPI error body; `detail` is a string or a list of validation errors.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Read access to the server registry, plus the admin operations.
///
/// Abstracted so the front ends can run against a fake.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch all servers and their tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    async fn fetch_servers(&self) -> Result<Vec<ServerDescriptor>, RegistryError>;

    /// Ask the backend to launch and connect a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    async fn add_server(&self, name: &str, launch: &ServerLaunch)
        -> Result<ServerAck, RegistryError>;

    /// Disconnect a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server is unknown.
    async fn remove_server(&self, name: &str) -> Result<ServerAck, RegistryError>;

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn health(&self) -> Result<HealthStatus, RegistryError>;
}

/// Registry client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: Client,
    base_url: String,
}

impl HttpRegistry {
    /// Create a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of one server's resource, with `name` percent-encoded as a
    /// single path segment.
    fn server_url(&self, name: &str) -> Result<Url, RegistryError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| RegistryError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "servers", name]);
        Ok(url)
    }

    async fn handle_error(response: Response) -> RegistryError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(ErrorBody {
                detail: Value::String(detail),
            }) => detail,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) => format!("Backend returned status {status}"),
        };
        RegistryError::Api {
            status: status.as_u16(),
            message,
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RegistryError> {
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn fetch_servers(&self) -> Result<Vec<ServerDescriptor>, RegistryError> {
        let url = format!("{}/api/servers", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body: ListServersResponse = Self::parse(response).await?;
        tracing::debug!(count = body.servers.len(), "Fetched server registry");
        Ok(body.servers)
    }

    async fn add_server(
        &self,
        name: &str,
        launch: &ServerLaunch,
    ) -> Result<ServerAck, RegistryError> {
        let url = format!("{}/api/servers", self.base_url);
        let request = AddServerRequest {
            name,
            config: launch,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let ack: ServerAck = Self::parse(response).await?;
        tracing::info!(server = %ack.server, status = %ack.status, "Added server");
        Ok(ack)
    }

    async fn remove_server(&self, name: &str) -> Result<ServerAck, RegistryError> {
        let url = self.server_url(name)?;
        let response = self.client.delete(url).send().await?;
        let ack: ServerAck = Self::parse(response).await?;
        tracing::info!(server = %ack.server, status = %ack.status, "Removed server");
        Ok(ack)
    }

    async fn health(&self) -> Result<HealthStatus, RegistryError> {
        let url = format!("{}/", self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::parse(response).await
    }
}

/// Fetch the registry for display, falling back to an empty list.
///
/// A failed fetch is logged and never fatal.
pub async fn load_servers(registry: &dyn Registry) -> Vec<ServerDescriptor> {
    match registry.fetch_servers().await {
        Ok(servers) => servers,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch server registry");
            Vec::new()
        }
    }
}
