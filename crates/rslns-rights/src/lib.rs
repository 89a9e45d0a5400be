//! rslns-rights: rights fetching, caching, preloading and assertions
//!
//! This crate implements the rights pipeline that runs in front of every
//! RPC handler:
//! - The [`fetcher::RightsFetcher`] abstraction and its function-backed
//!   implementation
//! - The single-flight, dual-TTL [`cache::CachingFetcher`]
//! - The [`hook::RightsHook`] preload middleware
//! - The [`require`] assertion API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rslns-rights                  │
//! ├─────────────────────────────────────────────┤
//! │  fetcher.rs  - Fetcher trait, FnFetcher      │
//! │  cache.rs    - Single-flight dual-TTL cache  │
//! │  hook.rs     - Per-RPC rights preloading     │
//! │  require.rs  - Handler-side assertions       │
//! │  metrics.rs  - Hook counters                 │
//! │  config.rs   - Cache TTL configuration       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Control flow per RPC: the bootstrap installs a fetcher on the request
//! context, [`hook::RightsHook`] resolves the rights for every entity the
//! request names, and the handler asserts with [`require`].

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod hook;
pub mod metrics;
pub mod observability;
pub mod require;

// Re-export commonly used types at the crate root
pub use cache::{CachingFetcher, Clock};
pub use config::{CacheConfig, CacheSettings, InvalidCacheConfig};
pub use fetcher::{
    context_with_fetcher, fetcher_from_context, must_fetcher_from_context, FnFetcher,
    RightsFetcher, NO_FETCHER_PANIC,
};
pub use hook::{
    context_with_rights, rights_from_context, RequestIdentifiers, RightsHook, HOOK_NAME,
};
pub use require::{
    context_with_fresh_memoization, require_any, require_application, require_client,
    require_gateway, require_is_admin, require_organization, require_universal, require_user,
};
