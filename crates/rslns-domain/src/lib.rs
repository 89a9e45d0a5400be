//! rslns-domain: core rights model
//!
//! This crate contains the value types shared by the rights subsystem:
//! - Entity identifiers and canonicalization
//! - Rights, rights sets and auth info
//! - The per-request rights map
//! - The request context threaded through every call
//! - The error taxonomy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rslns-domain                  │
//! ├─────────────────────────────────────────────┤
//! │  identifiers.rs - Entity ids, canonical form │
//! │  rights.rs      - Rights, sets, auth info    │
//! │  map.rs         - Per-request rights map     │
//! │  context.rs     - Request context            │
//! │  error.rs       - Error taxonomy             │
//! └─────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod identifiers;
pub mod map;
pub mod rights;

// Re-export commonly used types at the crate root
pub use context::{Context, Credentials};
pub use error::{RightsError, RightsResult};
pub use identifiers::{EntityId, EntityKind};
pub use map::EntityRights;
pub use rights::{AuthInfo, Right, Rights};
