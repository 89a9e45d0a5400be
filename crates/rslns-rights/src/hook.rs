//! Request-scoped rights preloading.
//!
//! The hook runs before each RPC handler: it pulls the entity
//! identifiers out of the request message, resolves the caller's rights
//! for each through the fetcher installed on the context, and attaches
//! the finished per-request rights map. Handlers then make authorization
//! checks as pure context lookups via [`crate::require`].
//!
//! Permission-denied from the fetcher is collapsed into "no entry": the
//! assertion layer downstream reports the uniform domain-level "no
//! rights" error instead of a transport-level denial. Unauthenticated
//! and transport errors abort the RPC.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use rslns_domain::{Context, EntityId, EntityRights, RightsError};

use crate::fetcher::must_fetcher_from_context;
use crate::metrics::{outcome, record_request};
use crate::require::context_with_fresh_memoization;

/// Well-known registration name of the preload hook, so duplicate
/// registration is detectable by the host RPC framework.
pub const HOOK_NAME: &str = "rights-fetcher";

/// The identifiers view of a request message.
///
/// Request messages that name entities implement this; the hook fetches
/// rights for each returned identifier. Messages without the view go
/// through [`RightsHook::unary_opaque`] and rely on universal-rights or
/// admin checks instead.
pub trait RequestIdentifiers {
    /// The flat list of entity identifiers this request operates on.
    fn combined_identifiers(&self) -> Vec<EntityId>;
}

#[derive(Clone)]
struct RightsMapExt(Arc<EntityRights>);

/// Attaches a finished rights map to the context.
pub fn context_with_rights(ctx: Context, rights: EntityRights) -> Context {
    ctx.with_value(RightsMapExt(Arc::new(rights)))
}

/// The per-request rights map, for handlers that need conditional logic
/// based on which rights the caller actually holds.
pub fn rights_from_context(ctx: &Context) -> Option<Arc<EntityRights>> {
    ctx.value::<RightsMapExt>().map(|ext| Arc::clone(&ext.0))
}

/// The rights preload middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct RightsHook;

impl RightsHook {
    pub fn new() -> Self {
        Self
    }

    /// Wraps a unary RPC whose request exposes an identifiers view.
    ///
    /// Fetches rights for every distinct canonical identifier in the
    /// request (in request order), attaches the rights map and a fresh
    /// memoization cache, and invokes `handler` with the derived context.
    ///
    /// Composing the hook with itself is safe: a context that already
    /// carries a rights map passes through without re-fetching.
    ///
    /// # Panics
    ///
    /// Panics with [`crate::fetcher::NO_FETCHER_PANIC`] if no fetcher is
    /// installed on the context.
    pub async fn unary<Req, Res, E, H, Fut>(
        &self,
        ctx: Context,
        req: Req,
        handler: H,
    ) -> Result<Res, E>
    where
        Req: RequestIdentifiers,
        E: From<RightsError>,
        H: FnOnce(Context, Req) -> Fut,
        Fut: Future<Output = Result<Res, E>>,
    {
        let fetcher = must_fetcher_from_context(&ctx);
        if rights_from_context(&ctx).is_some() {
            return handler(ctx, req).await;
        }

        let mut rights_map = EntityRights::new();
        let mut seen = HashSet::new();
        for id in req.combined_identifiers() {
            let id = id.canonical();
            if id.is_empty() || !seen.insert(id.unique_id()) {
                continue;
            }
            let kind = id.kind().as_str();
            match fetcher.entity_rights(&ctx, &id).await {
                Ok(rights) => {
                    record_request(
                        kind,
                        if rights.is_empty() { outcome::ZERO } else { outcome::OK },
                    );
                    rights_map.insert(&id, rights);
                }
                Err(RightsError::PermissionDenied) => {
                    // The caller simply has no rights here; the assertion
                    // layer reports that downstream.
                    record_request(kind, outcome::PERMISSION_DENIED);
                }
                Err(err) => {
                    record_request(
                        kind,
                        if err.is_unauthenticated() {
                            outcome::UNAUTHENTICATED
                        } else {
                            outcome::ERROR
                        },
                    );
                    return Err(E::from(err));
                }
            }
        }

        let ctx = context_with_fresh_memoization(context_with_rights(ctx, rights_map));
        handler(ctx, req).await
    }

    /// Wraps a unary RPC whose request has no identifiers view.
    ///
    /// The call passes through unchanged (no rights map is installed);
    /// such RPCs use universal-rights or admin assertions, which fall
    /// back to the fetcher directly.
    ///
    /// # Panics
    ///
    /// Panics with [`crate::fetcher::NO_FETCHER_PANIC`] if no fetcher is
    /// installed on the context.
    pub async fn unary_opaque<Req, Res, E, H, Fut>(
        &self,
        ctx: Context,
        req: Req,
        handler: H,
    ) -> Result<Res, E>
    where
        H: FnOnce(Context, Req) -> Fut,
        Fut: Future<Output = Result<Res, E>>,
    {
        let _ = must_fetcher_from_context(&ctx);
        handler(context_with_fresh_memoization(ctx), req).await
    }
}
