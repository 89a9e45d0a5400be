//! The rights fetcher abstraction.
//!
//! A [`RightsFetcher`] is a read-only oracle: given the caller's
//! credentials (carried in the [`Context`]) and an entity id, it answers
//! which rights those credentials grant. The six operations are kept
//! separate so the identity registry's wire contract can evolve per kind;
//! [`RightsFetcher::entity_rights`] dispatches on the canonical kind for
//! callers that hold a tagged identifier.
//!
//! Fetchers compose by wrapping. Wrappers must preserve the error-class
//! distinctions of [`RightsError`]: unauthenticated, permission-denied and
//! transport errors are treated differently upstack.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use rslns_domain::{AuthInfo, Context, EntityId, Rights, RightsError, RightsResult};

/// Panic message for the programming error of running rights-dependent
/// code without installing a fetcher first. Caught by the process-level
/// recovery layer and mapped to an internal error.
pub const NO_FETCHER_PANIC: &str = "rights: no fetcher in context";

/// Read-only oracle answering rights and auth-info queries.
#[async_trait]
pub trait RightsFetcher: Send + Sync {
    async fn application_rights(&self, ctx: &Context, application_id: &str)
        -> RightsResult<Rights>;

    async fn client_rights(&self, ctx: &Context, client_id: &str) -> RightsResult<Rights>;

    async fn gateway_rights(&self, ctx: &Context, gateway_id: &str) -> RightsResult<Rights>;

    async fn organization_rights(
        &self,
        ctx: &Context,
        organization_id: &str,
    ) -> RightsResult<Rights>;

    async fn user_rights(&self, ctx: &Context, user_id: &str) -> RightsResult<Rights>;

    async fn auth_info(&self, ctx: &Context) -> RightsResult<AuthInfo>;

    /// Dispatches to the operation for the canonical kind of `id`.
    ///
    /// End devices resolve through their parent application.
    async fn entity_rights(&self, ctx: &Context, id: &EntityId) -> RightsResult<Rights> {
        match id {
            EntityId::Application { application_id }
            | EntityId::EndDevice { application_id, .. } => {
                self.application_rights(ctx, application_id).await
            }
            EntityId::Client { client_id } => self.client_rights(ctx, client_id).await,
            EntityId::Gateway { gateway_id } => self.gateway_rights(ctx, gateway_id).await,
            EntityId::Organization { organization_id } => {
                self.organization_rights(ctx, organization_id).await
            }
            EntityId::User { user_id } => self.user_rights(ctx, user_id).await,
        }
    }
}

#[derive(Clone)]
struct FetcherExt(Arc<dyn RightsFetcher>);

/// Installs `fetcher` on the context.
///
/// The process bootstrap calls this once per inbound call, before the
/// rights preload hook runs.
pub fn context_with_fetcher(ctx: Context, fetcher: Arc<dyn RightsFetcher>) -> Context {
    ctx.with_value(FetcherExt(fetcher))
}

/// The fetcher installed on the context, if any.
pub fn fetcher_from_context(ctx: &Context) -> Option<Arc<dyn RightsFetcher>> {
    ctx.value::<FetcherExt>().map(|ext| Arc::clone(&ext.0))
}

/// The fetcher installed on the context.
///
/// # Panics
///
/// Panics with [`NO_FETCHER_PANIC`] if no fetcher was installed. This is
/// a programming error in the call chain setup, not a runtime condition.
pub fn must_fetcher_from_context(ctx: &Context) -> Arc<dyn RightsFetcher> {
    fetcher_from_context(ctx).unwrap_or_else(|| panic!("{NO_FETCHER_PANIC}"))
}

type EntityFn =
    dyn Fn(Context, EntityId) -> BoxFuture<'static, RightsResult<Rights>> + Send + Sync;
type AuthInfoFn = dyn Fn(Context) -> BoxFuture<'static, RightsResult<AuthInfo>> + Send + Sync;

/// Function-backed fetcher.
///
/// Adapts a single entity-rights function into the six-method interface
/// by dispatching on entity kind. Used by test harnesses and embedded
/// deployments that resolve rights in-process.
pub struct FnFetcher {
    entity: Arc<EntityFn>,
    auth_info: Arc<AuthInfoFn>,
}

impl FnFetcher {
    /// A fetcher answering entity queries with `entity`.
    ///
    /// Auth-info queries fail with `Unauthenticated` until an auth-info
    /// function is installed with [`FnFetcher::with_auth_info`].
    pub fn new<F>(entity: F) -> Self
    where
        F: Fn(Context, EntityId) -> BoxFuture<'static, RightsResult<Rights>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            entity: Arc::new(entity),
            auth_info: Arc::new(|_ctx| {
                Box::pin(async { Err(RightsError::Unauthenticated) })
            }),
        }
    }

    pub fn with_auth_info<F>(mut self, auth_info: F) -> Self
    where
        F: Fn(Context) -> BoxFuture<'static, RightsResult<AuthInfo>> + Send + Sync + 'static,
    {
        self.auth_info = Arc::new(auth_info);
        self
    }
}

#[async_trait]
impl RightsFetcher for FnFetcher {
    async fn application_rights(
        &self,
        ctx: &Context,
        application_id: &str,
    ) -> RightsResult<Rights> {
        (self.entity)(ctx.clone(), EntityId::application(application_id)).await
    }

    async fn client_rights(&self, ctx: &Context, client_id: &str) -> RightsResult<Rights> {
        (self.entity)(ctx.clone(), EntityId::client(client_id)).await
    }

    async fn gateway_rights(&self, ctx: &Context, gateway_id: &str) -> RightsResult<Rights> {
        (self.entity)(ctx.clone(), EntityId::gateway(gateway_id)).await
    }

    async fn organization_rights(
        &self,
        ctx: &Context,
        organization_id: &str,
    ) -> RightsResult<Rights> {
        (self.entity)(ctx.clone(), EntityId::organization(organization_id)).await
    }

    async fn user_rights(&self, ctx: &Context, user_id: &str) -> RightsResult<Rights> {
        (self.entity)(ctx.clone(), EntityId::user(user_id)).await
    }

    async fn auth_info(&self, ctx: &Context) -> RightsResult<AuthInfo> {
        (self.auth_info)(ctx.clone()).await
    }
}
