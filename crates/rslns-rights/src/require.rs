//! The assertion API handlers call to demand rights.
//!
//! Each per-entity assertion consults three sources in order: the rights
//! map attached by the preload hook, a lazily-populated per-context
//! memoization cache, and finally the fetcher itself. The fetcher path
//! applies the same permission-denied collapse as the hook, so callers
//! always see the uniform domain-level "no rights" error.
//!
//! Every assertion fails with one of two variants: *no rights* (the
//! caller holds nothing on the entity) or *insufficient rights* (some
//! held, the listed ones missing). Both belong to the permission-denied
//! class for transport propagation.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use rslns_domain::{
    AuthInfo, Context, EntityId, Right, Rights, RightsError, RightsResult,
};

use crate::fetcher::must_fetcher_from_context;
use crate::hook::rights_from_context;

/// Per-context memoization of fetched rights.
///
/// A handler that asserts on an entity and later fetches it again (for
/// example `require_application` followed by a listing that needs the
/// same rights) only pays for one fetch.
#[derive(Debug, Default)]
struct RightsMemo {
    entities: DashMap<String, Rights>,
    auth_info: Mutex<Option<AuthInfo>>,
}

#[derive(Clone, Default)]
struct MemoExt(Arc<RightsMemo>);

/// Attaches a fresh, empty memoization cache to the context.
///
/// Installed by the preload hook; processes that invoke handlers without
/// the hook may install it themselves.
pub fn context_with_fresh_memoization(ctx: Context) -> Context {
    ctx.with_value(MemoExt::default())
}

fn memo_from_context(ctx: &Context) -> Option<Arc<RightsMemo>> {
    ctx.value::<MemoExt>().map(|ext| Arc::clone(&ext.0))
}

/// The caller's rights on `id`, collapsing permission-denied to empty.
///
/// Consults the installed rights map first (where an absent key already
/// means "no rights"), then the memoization cache, then the fetcher.
async fn entity_rights_or_empty(ctx: &Context, id: &EntityId) -> RightsResult<Rights> {
    let canonical = id.canonical();
    if let Some(map) = rights_from_context(ctx) {
        return Ok(map.get(&canonical).cloned().unwrap_or_default());
    }

    let unique_id = canonical.unique_id();
    let memo = memo_from_context(ctx);
    if let Some(memo) = &memo {
        if let Some(rights) = memo.entities.get(&unique_id) {
            return Ok(rights.clone());
        }
    }

    let fetcher = must_fetcher_from_context(ctx);
    let rights = match fetcher.entity_rights(ctx, &canonical).await {
        Ok(rights) => rights,
        Err(RightsError::PermissionDenied) => Rights::new(),
        Err(err) => return Err(err),
    };
    if let Some(memo) = &memo {
        memo.entities.insert(unique_id, rights.clone());
    }
    Ok(rights)
}

/// The caller's auth info, collapsing permission-denied to the empty
/// record, memoized per context.
async fn auth_info_or_empty(ctx: &Context) -> RightsResult<AuthInfo> {
    let memo = memo_from_context(ctx);
    if let Some(memo) = &memo {
        if let Some(info) = memo.auth_info.lock().expect("memo mutex poisoned").clone() {
            return Ok(info);
        }
    }

    let fetcher = must_fetcher_from_context(ctx);
    let info = match fetcher.auth_info(ctx).await {
        Ok(info) => info,
        Err(RightsError::PermissionDenied) => AuthInfo::default(),
        Err(err) => return Err(err),
    };
    if let Some(memo) = &memo {
        *memo.auth_info.lock().expect("memo mutex poisoned") = Some(info.clone());
    }
    Ok(info)
}

async fn require_entity(ctx: &Context, id: EntityId, required: &[Right]) -> RightsResult<()> {
    let canonical = id.canonical();
    let held = entity_rights_or_empty(ctx, &canonical).await?;
    if held.is_empty() {
        return Err(RightsError::NoEntityRights {
            kind: canonical.kind(),
            unique_id: canonical.unique_id(),
        });
    }
    let missing = held.missing(required);
    if !missing.is_empty() {
        return Err(RightsError::InsufficientEntityRights {
            kind: canonical.kind(),
            unique_id: canonical.unique_id(),
            missing,
        });
    }
    Ok(())
}

/// Demands `required` rights on the named application.
pub async fn require_application(
    ctx: &Context,
    application_id: &str,
    required: &[Right],
) -> RightsResult<()> {
    require_entity(ctx, EntityId::application(application_id), required).await
}

/// Demands `required` rights on the named client.
pub async fn require_client(ctx: &Context, client_id: &str, required: &[Right]) -> RightsResult<()> {
    require_entity(ctx, EntityId::client(client_id), required).await
}

/// Demands `required` rights on the named gateway.
pub async fn require_gateway(
    ctx: &Context,
    gateway_id: &str,
    required: &[Right],
) -> RightsResult<()> {
    require_entity(ctx, EntityId::gateway(gateway_id), required).await
}

/// Demands `required` rights on the named organization.
pub async fn require_organization(
    ctx: &Context,
    organization_id: &str,
    required: &[Right],
) -> RightsResult<()> {
    require_entity(ctx, EntityId::organization(organization_id), required).await
}

/// Demands `required` rights on the named user.
pub async fn require_user(ctx: &Context, user_id: &str, required: &[Right]) -> RightsResult<()> {
    require_entity(ctx, EntityId::user(user_id), required).await
}

/// Demands `required` universal rights.
///
/// Fails with `NoUniversalRights` when the caller's universal set is
/// empty, or `InsufficientUniversalRights` listing the missing rights.
pub async fn require_universal(ctx: &Context, required: &[Right]) -> RightsResult<()> {
    let info = auth_info_or_empty(ctx).await?;
    if info.universal_rights.is_empty() {
        return Err(RightsError::NoUniversalRights);
    }
    let missing = info.universal_rights.missing(required);
    if !missing.is_empty() {
        return Err(RightsError::InsufficientUniversalRights { missing });
    }
    Ok(())
}

/// Demands that the caller is a service administrator.
pub async fn require_is_admin(ctx: &Context) -> RightsResult<()> {
    let info = auth_info_or_empty(ctx).await?;
    if !info.is_admin {
        return Err(RightsError::NoAdmin);
    }
    Ok(())
}

/// Demands some rights (any non-empty set) on every listed identifier.
///
/// Used by RPCs that take multiple ids and need at least visibility on
/// each of them.
pub async fn require_any(ctx: &Context, ids: &[EntityId]) -> RightsResult<()> {
    for id in ids {
        require_entity(ctx, id.clone(), &[]).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{context_with_fetcher, FnFetcher, RightsFetcher};
    use crate::hook::context_with_rights;
    use rslns_domain::{EntityKind, EntityRights};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx_with_map(entries: &[(EntityId, Rights)]) -> Context {
        let mut map = EntityRights::new();
        for (id, rights) in entries {
            map.insert(id, rights.clone());
        }
        context_with_rights(Context::background(), map)
    }

    #[tokio::test]
    async fn happy_path_and_insufficient_listing() {
        let ctx = ctx_with_map(&[(
            EntityId::application("foo"),
            Rights::from([Right::ApplicationInfo]),
        )]);

        require_application(&ctx, "foo", &[Right::ApplicationInfo])
            .await
            .unwrap();

        let err = require_application(
            &ctx,
            "foo",
            &[Right::ApplicationInfo, Right::ApplicationSettingsBasic],
        )
        .await
        .unwrap_err();
        match err {
            RightsError::InsufficientEntityRights {
                kind,
                unique_id,
                missing,
            } => {
                assert_eq!(kind, EntityKind::Application);
                assert_eq!(unique_id, "application:foo");
                assert_eq!(missing, vec![Right::ApplicationSettingsBasic]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_required_succeeds_on_any_held_rights() {
        let ctx = ctx_with_map(&[(
            EntityId::gateway("gw-1"),
            Rights::from([Right::GatewayInfo]),
        )]);
        require_gateway(&ctx, "gw-1", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn absent_entry_and_empty_set_fail_alike() {
        let ctx = ctx_with_map(&[(EntityId::application("present"), Rights::new())]);

        let absent = require_application(&ctx, "absent", &[Right::ApplicationInfo])
            .await
            .unwrap_err();
        let empty = require_application(&ctx, "present", &[Right::ApplicationInfo])
            .await
            .unwrap_err();
        assert!(matches!(absent, RightsError::NoEntityRights { .. }));
        assert!(matches!(empty, RightsError::NoEntityRights { .. }));
    }

    #[tokio::test]
    async fn end_device_assertions_check_the_parent_application() {
        let ctx = ctx_with_map(&[(
            EntityId::end_device("foo", "dev-1"),
            Rights::from([Right::ApplicationDevicesRead]),
        )]);
        require_application(&ctx, "foo", &[Right::ApplicationDevicesRead])
            .await
            .unwrap();
    }

    fn counting_ctx(
        result: impl Fn() -> RightsResult<Rights> + Send + Sync + 'static,
    ) -> (Context, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let task_calls = Arc::clone(&calls);
        let result = Arc::new(result);
        let fetcher: Arc<dyn RightsFetcher> = Arc::new(FnFetcher::new(move |_ctx, _id| {
            task_calls.fetch_add(1, Ordering::SeqCst);
            let result = Arc::clone(&result);
            Box::pin(async move { result() })
        }));
        // No rights map installed: assertions go through memo + fetcher.
        let ctx = context_with_fresh_memoization(context_with_fetcher(
            Context::background(),
            fetcher,
        ));
        (ctx, calls)
    }

    #[tokio::test]
    async fn fetcher_fallback_collapses_permission_denied() {
        let (ctx, _) = counting_ctx(|| Err(RightsError::PermissionDenied));
        let err = require_application(&ctx, "foo", &[Right::ApplicationInfo])
            .await
            .unwrap_err();
        // Not the raw transport-level denial.
        assert!(matches!(err, RightsError::NoEntityRights { .. }));
    }

    #[tokio::test]
    async fn fetcher_fallback_is_memoized_per_context() {
        let (ctx, calls) = counting_ctx(|| Ok(Rights::from([Right::ApplicationInfo])));
        require_application(&ctx, "foo", &[Right::ApplicationInfo])
            .await
            .unwrap();
        require_application(&ctx, "foo", &[]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_errors_propagate_from_fallback() {
        let (ctx, _) = counting_ctx(|| Err(RightsError::unavailable("down")));
        let err = require_application(&ctx, "foo", &[]).await.unwrap_err();
        assert!(matches!(err, RightsError::Unavailable { .. }));
    }

    fn auth_ctx(info: AuthInfo) -> (Context, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let task_calls = Arc::clone(&calls);
        let fetcher: Arc<dyn RightsFetcher> = Arc::new(
            FnFetcher::new(|_ctx, _id| Box::pin(async { Ok(Rights::new()) })).with_auth_info(
                move |_ctx| {
                    task_calls.fetch_add(1, Ordering::SeqCst);
                    let info = info.clone();
                    Box::pin(async move { Ok(info) })
                },
            ),
        );
        let ctx = context_with_fresh_memoization(context_with_fetcher(
            Context::background(),
            fetcher,
        ));
        (ctx, calls)
    }

    #[tokio::test]
    async fn universal_rights_checks() {
        let (ctx, calls) = auth_ctx(AuthInfo {
            universal_rights: Rights::from([Right::SendInvites]),
            is_admin: false,
        });
        require_universal(&ctx, &[Right::SendInvites]).await.unwrap();

        let err = require_universal(&ctx, &[Right::SendInvites, Right::UserDelete])
            .await
            .unwrap_err();
        match err {
            RightsError::InsufficientUniversalRights { missing } => {
                assert_eq!(missing, vec![Right::UserDelete]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Memoized: both assertions share one auth-info fetch.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_universal_set_is_no_universal_rights() {
        let (ctx, _) = auth_ctx(AuthInfo::default());
        let err = require_universal(&ctx, &[]).await.unwrap_err();
        assert!(matches!(err, RightsError::NoUniversalRights));
    }

    #[tokio::test]
    async fn admin_flag_checks() {
        let (ctx, _) = auth_ctx(AuthInfo {
            universal_rights: Rights::new(),
            is_admin: true,
        });
        require_is_admin(&ctx).await.unwrap();

        let (ctx, _) = auth_ctx(AuthInfo::default());
        assert!(matches!(
            require_is_admin(&ctx).await.unwrap_err(),
            RightsError::NoAdmin
        ));
    }

    #[tokio::test]
    async fn require_any_needs_visibility_on_every_id() {
        let ctx = ctx_with_map(&[
            (
                EntityId::application("foo"),
                Rights::from([Right::ApplicationInfo]),
            ),
            (EntityId::gateway("gw-1"), Rights::from([Right::GatewayInfo])),
        ]);

        require_any(
            &ctx,
            &[EntityId::application("foo"), EntityId::gateway("gw-1")],
        )
        .await
        .unwrap();

        let err = require_any(
            &ctx,
            &[EntityId::application("foo"), EntityId::user("alice")],
        )
        .await
        .unwrap_err();
        match err {
            RightsError::NoEntityRights { kind, unique_id } => {
                assert_eq!(kind, EntityKind::User);
                assert_eq!(unique_id, "user:alice");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
