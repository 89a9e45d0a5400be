//! Caching rights fetcher with single-flight semantics.
//!
//! Wraps any [`RightsFetcher`] and absorbs read load on behalf of the
//! identity registry. Six maps (five entity kinds plus auth info) hold
//! results keyed by `(auth-type, auth-value, unique id)`; concurrent
//! callers for the same key share one underlying fetch, successful
//! results live for `success_ttl` and errored results for `error_ttl`
//! (a negative cache, not a retry mechanism).
//!
//! # Concurrency
//!
//! One mutex guards structural changes to all six maps; the critical
//! section covers lookup, insert and garbage collection. Waiting on a
//! pending entry always happens outside the lock, and entries are
//! immutable once their completion signal has fired.
//!
//! A waiter's cancellation unblocks that waiter only; the underlying
//! fetch runs on its own detached context (tied to an optional shutdown
//! token) so siblings sharing the entry still get their result. If the
//! fetch itself is cancelled, the stored error carries no timestamp and
//! the entry is invalid for every subsequent lookup, so a transient
//! cancellation cannot poison the cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rslns_domain::{
    AuthInfo, Context, Credentials, EntityId, Rights, RightsError, RightsResult,
};

use crate::config::{CacheConfig, InvalidCacheConfig};
use crate::fetcher::RightsFetcher;
use crate::metrics::{outcome_for, record_fetch, AUTH_INFO_KIND};

/// Injected time source. Defaults to [`Instant::now`]; tests substitute
/// a controllable clock.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// Cache key.
///
/// Entity entries use the entity's unique id; auth-info entries leave it
/// empty (their identity is the credential pair alone). Unauthenticated
/// traffic never reaches the cache, so credentials are always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    auth_type: String,
    auth_value: String,
    unique_id: String,
}

impl Key {
    fn entity(credentials: &Credentials, unique_id: String) -> Self {
        Self {
            auth_type: credentials.auth_type.clone(),
            auth_value: credentials.auth_value.clone(),
            unique_id,
        }
    }

    fn auth_info(credentials: &Credentials) -> Self {
        Self::entity(credentials, String::new())
    }
}

struct Finalized<T> {
    result: RightsResult<T>,
    /// `None` when the fetch was cancelled or timed out; such entries are
    /// never valid.
    finalized_at: Option<Instant>,
}

struct CacheEntry<T> {
    done: watch::Receiver<bool>,
    result: OnceLock<Finalized<T>>,
}

impl<T> CacheEntry<T> {
    fn valid(&self, now: Instant, config: &CacheConfig) -> bool {
        match self.result.get() {
            // Fetch still in flight: joinable by definition.
            None => true,
            Some(finalized) => match finalized.finalized_at {
                None => false,
                Some(at) => {
                    let ttl = if finalized.result.is_ok() {
                        config.success_ttl
                    } else {
                        config.error_ttl
                    };
                    now.saturating_duration_since(at) <= ttl
                }
            },
        }
    }
}

struct Maps {
    application: HashMap<Key, Arc<CacheEntry<Rights>>>,
    client: HashMap<Key, Arc<CacheEntry<Rights>>>,
    gateway: HashMap<Key, Arc<CacheEntry<Rights>>>,
    organization: HashMap<Key, Arc<CacheEntry<Rights>>>,
    user: HashMap<Key, Arc<CacheEntry<Rights>>>,
    auth_info: HashMap<Key, Arc<CacheEntry<AuthInfo>>>,
    last_gc: Instant,
}

impl Maps {
    fn len(&self) -> usize {
        self.application.len()
            + self.client.len()
            + self.gateway.len()
            + self.organization.len()
            + self.user.len()
            + self.auth_info.len()
    }
}

enum Role<T> {
    Wait(Arc<CacheEntry<T>>),
    Lead {
        entry: Arc<CacheEntry<T>>,
        tx: watch::Sender<bool>,
    },
}

/// A [`RightsFetcher`] wrapper with per-key single-flight and dual-TTL
/// caching.
pub struct CachingFetcher<F> {
    inner: Arc<F>,
    config: CacheConfig,
    clock: Clock,
    shutdown: CancellationToken,
    maps: Mutex<Maps>,
}

impl<F: RightsFetcher + 'static> CachingFetcher<F> {
    /// Wraps `inner` with the given TTL configuration.
    ///
    /// Rejects zero TTLs: this cache has no pass-through mode.
    pub fn new(inner: F, config: CacheConfig) -> Result<Self, InvalidCacheConfig> {
        config.validate()?;
        let clock: Clock = Arc::new(Instant::now);
        let now = (*clock)();
        Ok(Self {
            inner: Arc::new(inner),
            config,
            clock,
            shutdown: CancellationToken::new(),
            maps: Mutex::new(Maps {
                application: HashMap::new(),
                client: HashMap::new(),
                gateway: HashMap::new(),
                organization: HashMap::new(),
                user: HashMap::new(),
                auth_info: HashMap::new(),
                last_gc: now,
            }),
        })
    }

    /// Substitutes the time source. For deterministic tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        let now = (*clock)();
        self.clock = clock;
        self.maps.get_mut().expect("rights cache mutex poisoned").last_gc = now;
        self
    }

    /// Ties background fetches to `shutdown` instead of a token that is
    /// never cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Deletes every entry that is no longer valid, if the last sweep is
    /// older than ten times the larger TTL. Called with the lock held,
    /// after every miss.
    fn maybe_gc(&self, maps: &mut Maps, now: Instant) {
        let horizon = self.config.success_ttl.max(self.config.error_ttl) * 10;
        if now.saturating_duration_since(maps.last_gc) <= horizon {
            return;
        }
        let before = maps.len();
        let config = &self.config;
        maps.application.retain(|_, entry| entry.valid(now, config));
        maps.client.retain(|_, entry| entry.valid(now, config));
        maps.gateway.retain(|_, entry| entry.valid(now, config));
        maps.organization.retain(|_, entry| entry.valid(now, config));
        maps.user.retain(|_, entry| entry.valid(now, config));
        maps.auth_info.retain(|_, entry| entry.valid(now, config));
        maps.last_gc = now;
        debug!(swept = before - maps.len(), "rights cache swept");
    }

    async fn lookup<T, Fut>(
        &self,
        ctx: &Context,
        kind: &'static str,
        key: Key,
        select: fn(&mut Maps) -> &mut HashMap<Key, Arc<CacheEntry<T>>>,
        fetch: impl FnOnce(Context) -> Fut,
    ) -> RightsResult<T>
    where
        T: crate::metrics::OutcomeValue + Clone + Send + Sync + 'static,
        Fut: Future<Output = RightsResult<T>> + Send + 'static,
    {
        let now = (*self.clock)();
        let role = {
            let mut maps = self.maps.lock().expect("rights cache mutex poisoned");
            let map = select(&mut maps);
            match map.get(&key) {
                Some(entry) if entry.valid(now, &self.config) => Role::Wait(Arc::clone(entry)),
                _ => {
                    let (tx, rx) = watch::channel(false);
                    let entry = Arc::new(CacheEntry {
                        done: rx,
                        result: OnceLock::new(),
                    });
                    map.insert(key, Arc::clone(&entry));
                    self.maybe_gc(&mut maps, now);
                    Role::Lead { entry, tx }
                }
            }
        };

        let entry = match role {
            Role::Wait(entry) => entry,
            Role::Lead { entry, tx } => {
                // The fetch outlives this waiter: it runs on a detached
                // context tied only to the shutdown token, keeping the
                // caller's credentials.
                let fetch_ctx = ctx.detached(self.shutdown.child_token());
                let fut = fetch(fetch_ctx);
                let clock = Arc::clone(&self.clock);
                let task_entry = Arc::clone(&entry);
                tokio::spawn(async move {
                    let result = fut.await;
                    record_fetch(kind, outcome_for(&result));
                    let finalized_at = match &result {
                        Err(err) if err.is_cancellation() => None,
                        _ => Some((*clock)()),
                    };
                    let _ = task_entry.result.set(Finalized {
                        result,
                        finalized_at,
                    });
                    tx.send_replace(true);
                });
                entry
            }
        };

        let mut done = entry.done.clone();
        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.cancellation_error()),
            recv = done.wait_for(|done| *done) => match recv {
                Ok(_) => match entry.result.get() {
                    Some(finalized) => finalized.result.clone(),
                    None => Err(RightsError::registry("rights fetch finished without result")),
                },
                Err(_) => Err(RightsError::registry("rights fetch task dropped")),
            },
        }
    }

    async fn entity_cached(
        &self,
        ctx: &Context,
        id: EntityId,
        select: fn(&mut Maps) -> &mut HashMap<Key, Arc<CacheEntry<Rights>>>,
    ) -> RightsResult<Rights> {
        let kind = id.kind().as_str();
        let Some(credentials) = ctx.credentials() else {
            // Credential absence short-circuits before the cache.
            let result = self.inner.entity_rights(ctx, &id).await;
            record_fetch(kind, outcome_for(&result));
            return result;
        };
        let key = Key::entity(credentials, id.unique_id());
        let inner = Arc::clone(&self.inner);
        self.lookup(ctx, kind, key, select, move |fetch_ctx| async move {
            inner.entity_rights(&fetch_ctx, &id).await
        })
        .await
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.maps.lock().expect("rights cache mutex poisoned").len()
    }
}

#[async_trait]
impl<F: RightsFetcher + 'static> RightsFetcher for CachingFetcher<F> {
    async fn application_rights(
        &self,
        ctx: &Context,
        application_id: &str,
    ) -> RightsResult<Rights> {
        self.entity_cached(ctx, EntityId::application(application_id), |maps| {
            &mut maps.application
        })
        .await
    }

    async fn client_rights(&self, ctx: &Context, client_id: &str) -> RightsResult<Rights> {
        self.entity_cached(ctx, EntityId::client(client_id), |maps| &mut maps.client)
            .await
    }

    async fn gateway_rights(&self, ctx: &Context, gateway_id: &str) -> RightsResult<Rights> {
        self.entity_cached(ctx, EntityId::gateway(gateway_id), |maps| &mut maps.gateway)
            .await
    }

    async fn organization_rights(
        &self,
        ctx: &Context,
        organization_id: &str,
    ) -> RightsResult<Rights> {
        self.entity_cached(ctx, EntityId::organization(organization_id), |maps| {
            &mut maps.organization
        })
        .await
    }

    async fn user_rights(&self, ctx: &Context, user_id: &str) -> RightsResult<Rights> {
        self.entity_cached(ctx, EntityId::user(user_id), |maps| &mut maps.user)
            .await
    }

    async fn auth_info(&self, ctx: &Context) -> RightsResult<AuthInfo> {
        let Some(credentials) = ctx.credentials() else {
            let result = self.inner.auth_info(ctx).await;
            record_fetch(AUTH_INFO_KIND, outcome_for(&result));
            return result;
        };
        let key = Key::auth_info(credentials);
        let inner = Arc::clone(&self.inner);
        self.lookup(
            ctx,
            AUTH_INFO_KIND,
            key,
            |maps| &mut maps.auth_info,
            move |fetch_ctx| async move { inner.auth_info(&fetch_ctx).await },
        )
        .await
    }
}
