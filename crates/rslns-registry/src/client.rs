//! Wire contract with the identity registry.
//!
//! The registry is an external service exposing one RightsList operation
//! per entity kind plus an auth-info operation. Only the contract lives
//! here; concrete clients (generated from the registry's protobuf
//! definitions) are provided by the host process, and tests supply
//! in-process fakes.

use std::sync::Arc;

use async_trait::async_trait;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::Status;
use tracing::warn;

use rslns_domain::{AuthInfo, Rights};

/// Call metadata forwarded with every registry RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedMetadata {
    /// `"<auth-type> <auth-value>"`, or `None` when credentials are
    /// withheld (unauthenticated caller, or insecure transport).
    pub authorization: Option<String>,
    /// Correlation id of the request being served.
    pub correlation_id: Option<String>,
}

impl ForwardedMetadata {
    /// Renders this metadata into gRPC request headers.
    ///
    /// Values that are not valid metadata are skipped with a warning
    /// rather than failing the call.
    pub fn to_metadata(&self) -> MetadataMap {
        let mut map = MetadataMap::new();
        if let Some(authorization) = &self.authorization {
            match MetadataValue::try_from(authorization.as_str()) {
                Ok(value) => {
                    map.insert("authorization", value);
                }
                Err(_) => warn!("authorization value is not valid metadata; skipping"),
            }
        }
        if let Some(correlation_id) = &self.correlation_id {
            match MetadataValue::try_from(correlation_id.as_str()) {
                Ok(value) => {
                    map.insert("x-correlation-id", value);
                }
                Err(_) => warn!("correlation id is not valid metadata; skipping"),
            }
        }
        map
    }
}

/// The six registry operations the rights subsystem consumes.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn application_rights_list(
        &self,
        meta: &ForwardedMetadata,
        application_id: &str,
    ) -> Result<Rights, Status>;

    async fn client_rights_list(
        &self,
        meta: &ForwardedMetadata,
        client_id: &str,
    ) -> Result<Rights, Status>;

    async fn gateway_rights_list(
        &self,
        meta: &ForwardedMetadata,
        gateway_id: &str,
    ) -> Result<Rights, Status>;

    async fn organization_rights_list(
        &self,
        meta: &ForwardedMetadata,
        organization_id: &str,
    ) -> Result<Rights, Status>;

    async fn user_rights_list(
        &self,
        meta: &ForwardedMetadata,
        user_id: &str,
    ) -> Result<Rights, Status>;

    async fn auth_info(&self, meta: &ForwardedMetadata) -> Result<AuthInfo, Status>;
}

/// A resolved registry connection.
#[derive(Clone)]
pub struct RegistryHandle {
    pub client: Arc<dyn RegistryClient>,
    /// Whether the transport to the registry is TLS-protected.
    /// Credentials are only forwarded over secure transports unless
    /// explicitly allowed otherwise.
    pub transport_secure: bool,
}

impl RegistryHandle {
    pub fn secure(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            transport_secure: true,
        }
    }

    pub fn insecure(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            transport_secure: false,
        }
    }
}

/// Yields the current registry connection, if one is available.
///
/// Connections come and go with cluster membership; the remote fetcher
/// resolves one per call and fails with `Unavailable` when there is
/// none.
pub trait RegistryProvider: Send + Sync {
    fn registry(&self) -> Option<RegistryHandle>;
}

/// A provider pinned to one handle. Suitable for static deployments and
/// tests.
pub struct StaticProvider {
    handle: Option<RegistryHandle>,
}

impl StaticProvider {
    pub fn new(handle: RegistryHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// A provider that never yields a connection.
    pub fn disconnected() -> Self {
        Self { handle: None }
    }
}

impl RegistryProvider for StaticProvider {
    fn registry(&self) -> Option<RegistryHandle> {
        self.handle.clone()
    }
}
