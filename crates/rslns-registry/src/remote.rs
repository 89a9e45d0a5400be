//! The remote rights fetcher.
//!
//! Resolves a registry connection per call, forwards the caller's
//! credentials and correlation id in the outbound metadata, and maps the
//! registry's status codes onto the rights error taxonomy. Responses are
//! returned verbatim.
//!
//! Credentials are only forwarded over TLS transports. Forwarding over
//! plaintext must be opted into with
//! [`RemoteFetcher::with_insecure_credentials`] (development setups
//! only); otherwise the credentials are withheld and the registry
//! answers as it would for unauthenticated traffic.

use std::future::Future;

use async_trait::async_trait;
use tonic::Status;
use tracing::warn;
use uuid::Uuid;

use rslns_domain::{AuthInfo, Context, Rights, RightsError, RightsResult};
use rslns_rights::fetcher::RightsFetcher;

use crate::client::{ForwardedMetadata, RegistryHandle, RegistryProvider};
use crate::status::classify_status;

/// A [`RightsFetcher`] backed by the identity registry.
pub struct RemoteFetcher<P> {
    provider: P,
    allow_insecure: bool,
}

impl<P: RegistryProvider> RemoteFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            allow_insecure: false,
        }
    }

    /// Allows forwarding credentials over non-TLS transports.
    pub fn with_insecure_credentials(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    fn resolve(&self) -> RightsResult<RegistryHandle> {
        self.provider
            .registry()
            .ok_or_else(|| RightsError::unavailable("no connection to identity registry"))
    }

    fn forwarded_metadata(&self, ctx: &Context, handle: &RegistryHandle) -> ForwardedMetadata {
        let authorization = match ctx.credentials() {
            None => None,
            Some(credentials) => {
                if handle.transport_secure || self.allow_insecure {
                    Some(format!("{} {}", credentials.auth_type, credentials.auth_value))
                } else {
                    warn!("not forwarding credentials over insecure transport");
                    None
                }
            }
        };
        let correlation_id = ctx
            .correlation_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        ForwardedMetadata {
            authorization,
            correlation_id: Some(correlation_id),
        }
    }

    async fn call<T, Fut>(
        &self,
        ctx: &Context,
        operation: impl FnOnce(RegistryHandle, ForwardedMetadata) -> Fut,
    ) -> RightsResult<T>
    where
        Fut: Future<Output = Result<T, Status>>,
    {
        ctx.check_cancelled()?;
        let handle = self.resolve()?;
        let meta = self.forwarded_metadata(ctx, &handle);
        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.cancellation_error()),
            result = operation(handle, meta) => {
                result.map_err(|status| classify_status(&status))
            }
        }
    }
}

#[async_trait]
impl<P: RegistryProvider> RightsFetcher for RemoteFetcher<P> {
    async fn application_rights(
        &self,
        ctx: &Context,
        application_id: &str,
    ) -> RightsResult<Rights> {
        self.call(ctx, |handle, meta| async move {
            handle
                .client
                .application_rights_list(&meta, application_id)
                .await
        })
        .await
    }

    async fn client_rights(&self, ctx: &Context, client_id: &str) -> RightsResult<Rights> {
        self.call(ctx, |handle, meta| async move {
            handle.client.client_rights_list(&meta, client_id).await
        })
        .await
    }

    async fn gateway_rights(&self, ctx: &Context, gateway_id: &str) -> RightsResult<Rights> {
        self.call(ctx, |handle, meta| async move {
            handle.client.gateway_rights_list(&meta, gateway_id).await
        })
        .await
    }

    async fn organization_rights(
        &self,
        ctx: &Context,
        organization_id: &str,
    ) -> RightsResult<Rights> {
        self.call(ctx, |handle, meta| async move {
            handle
                .client
                .organization_rights_list(&meta, organization_id)
                .await
        })
        .await
    }

    async fn user_rights(&self, ctx: &Context, user_id: &str) -> RightsResult<Rights> {
        self.call(ctx, |handle, meta| async move {
            handle.client.user_rights_list(&meta, user_id).await
        })
        .await
    }

    async fn auth_info(&self, ctx: &Context) -> RightsResult<AuthInfo> {
        self.call(ctx, |handle, meta| async move {
            handle.client.auth_info(&meta).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RegistryClient, StaticProvider};
    use rslns_domain::{Credentials, Right};
    use std::sync::{Arc, Mutex};

    struct FakeRegistry {
        seen: Mutex<Vec<ForwardedMetadata>>,
        response: Result<Rights, tonic::Code>,
    }

    impl FakeRegistry {
        fn returning(rights: Rights) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                response: Ok(rights),
            })
        }

        fn failing(code: tonic::Code) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                response: Err(code),
            })
        }

        fn respond(&self, meta: &ForwardedMetadata) -> Result<Rights, Status> {
            self.seen.lock().unwrap().push(meta.clone());
            match &self.response {
                Ok(rights) => Ok(rights.clone()),
                Err(code) => Err(Status::new(*code, "registry says no")),
            }
        }

        fn last_meta(&self) -> ForwardedMetadata {
            self.seen.lock().unwrap().last().cloned().expect("no call seen")
        }
    }

    #[async_trait]
    impl RegistryClient for FakeRegistry {
        async fn application_rights_list(
            &self,
            meta: &ForwardedMetadata,
            _application_id: &str,
        ) -> Result<Rights, Status> {
            self.respond(meta)
        }

        async fn client_rights_list(
            &self,
            meta: &ForwardedMetadata,
            _client_id: &str,
        ) -> Result<Rights, Status> {
            self.respond(meta)
        }

        async fn gateway_rights_list(
            &self,
            meta: &ForwardedMetadata,
            _gateway_id: &str,
        ) -> Result<Rights, Status> {
            self.respond(meta)
        }

        async fn organization_rights_list(
            &self,
            meta: &ForwardedMetadata,
            _organization_id: &str,
        ) -> Result<Rights, Status> {
            self.respond(meta)
        }

        async fn user_rights_list(
            &self,
            meta: &ForwardedMetadata,
            _user_id: &str,
        ) -> Result<Rights, Status> {
            self.respond(meta)
        }

        async fn auth_info(&self, meta: &ForwardedMetadata) -> Result<AuthInfo, Status> {
            self.seen.lock().unwrap().push(meta.clone());
            Ok(AuthInfo::default())
        }
    }

    fn authed_ctx() -> Context {
        Context::background().with_credentials(Credentials::bearer("api-key"))
    }

    #[tokio::test]
    async fn no_connection_fails_unavailable() {
        let fetcher = RemoteFetcher::new(StaticProvider::disconnected());
        let err = fetcher
            .application_rights(&authed_ctx(), "foo")
            .await
            .unwrap_err();
        assert!(matches!(err, RightsError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn credentials_and_correlation_id_are_forwarded_over_tls() {
        let registry = FakeRegistry::returning(Rights::from([Right::ApplicationInfo]));
        let provider = StaticProvider::new(RegistryHandle::secure(registry.clone()));
        let fetcher = RemoteFetcher::new(provider);

        let ctx = authed_ctx().with_correlation_id("req-42");
        let rights = fetcher.application_rights(&ctx, "foo").await.unwrap();
        assert_eq!(rights, Rights::from([Right::ApplicationInfo]));

        let meta = registry.last_meta();
        assert_eq!(meta.authorization.as_deref(), Some("Bearer api-key"));
        assert_eq!(meta.correlation_id.as_deref(), Some("req-42"));
    }

    #[tokio::test]
    async fn credentials_are_withheld_over_plaintext() {
        let registry = FakeRegistry::returning(Rights::new());
        let provider = StaticProvider::new(RegistryHandle::insecure(registry.clone()));
        let fetcher = RemoteFetcher::new(provider);

        fetcher.gateway_rights(&authed_ctx(), "gw-1").await.unwrap();
        assert_eq!(registry.last_meta().authorization, None);
    }

    #[tokio::test]
    async fn insecure_forwarding_can_be_opted_into() {
        let registry = FakeRegistry::returning(Rights::new());
        let provider = StaticProvider::new(RegistryHandle::insecure(registry.clone()));
        let fetcher = RemoteFetcher::new(provider).with_insecure_credentials(true);

        fetcher.gateway_rights(&authed_ctx(), "gw-1").await.unwrap();
        assert_eq!(
            registry.last_meta().authorization.as_deref(),
            Some("Bearer api-key")
        );
    }

    #[tokio::test]
    async fn a_correlation_id_is_generated_when_the_context_has_none() {
        let registry = FakeRegistry::returning(Rights::new());
        let provider = StaticProvider::new(RegistryHandle::secure(registry.clone()));
        let fetcher = RemoteFetcher::new(provider);

        fetcher.user_rights(&authed_ctx(), "alice").await.unwrap();
        let correlation_id = registry.last_meta().correlation_id.expect("id generated");
        assert!(!correlation_id.is_empty());
    }

    #[tokio::test]
    async fn registry_statuses_classify_into_the_taxonomy() {
        let registry = FakeRegistry::failing(tonic::Code::PermissionDenied);
        let provider = StaticProvider::new(RegistryHandle::secure(registry));
        let fetcher = RemoteFetcher::new(provider);

        let err = fetcher
            .organization_rights(&authed_ctx(), "org")
            .await
            .unwrap_err();
        assert!(matches!(err, RightsError::PermissionDenied));

        let registry = FakeRegistry::failing(tonic::Code::Unauthenticated);
        let provider = StaticProvider::new(RegistryHandle::secure(registry));
        let fetcher = RemoteFetcher::new(provider);
        let err = fetcher.client_rights(&authed_ctx(), "cli").await.unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn cancelled_context_aborts_before_the_call() {
        let registry = FakeRegistry::returning(Rights::new());
        let provider = StaticProvider::new(RegistryHandle::secure(registry.clone()));
        let fetcher = RemoteFetcher::new(provider);

        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let ctx = authed_ctx().with_cancellation(token);
        let err = fetcher.application_rights(&ctx, "foo").await.unwrap_err();
        assert!(err.is_cancellation());
        assert!(registry.seen.lock().unwrap().is_empty());
    }
}
