//! rslns-registry: remote rights fetcher
//!
//! This crate holds the edge between the rights subsystem and the
//! external identity registry:
//! - The registry wire contract ([`client::RegistryClient`]) and
//!   connection provider
//! - The [`remote::RemoteFetcher`] implementation of
//!   [`rslns_rights::RightsFetcher`]
//! - Status-code classification in both directions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rslns-registry                 │
//! ├─────────────────────────────────────────────┤
//! │  client.rs - Wire contract, providers        │
//! │  remote.rs - RemoteFetcher                   │
//! │  status.rs - Status <-> error taxonomy       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod remote;
pub mod status;

// Re-export commonly used types at the crate root
pub use client::{
    ForwardedMetadata, RegistryClient, RegistryHandle, RegistryProvider, StaticProvider,
};
pub use remote::RemoteFetcher;
pub use status::{classify_status, status_from_error};
