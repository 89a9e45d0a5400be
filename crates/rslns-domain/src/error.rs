//! Error taxonomy for rights operations.
//!
//! The taxonomy mirrors what transports need to discriminate: credential
//! problems (`Unauthenticated`), denied lookups (`PermissionDenied`),
//! domain-level denials produced by the assertion layer (`No*` /
//! `Insufficient*`), connectivity (`Unavailable`) and caller departure
//! (`Cancelled` / `DeadlineExceeded`). Everything else from the identity
//! registry surfaces as `Registry`.

use thiserror::Error;

use crate::identifiers::EntityKind;
use crate::rights::Right;

/// Errors surfaced by the rights subsystem.
#[derive(Debug, Clone, Error)]
pub enum RightsError {
    /// Credentials absent or rejected by the identity registry.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The identity registry denied the lookup itself.
    ///
    /// The preload hook and the assertion layer collapse this into an
    /// empty rights set; callers normally see the domain-level
    /// `NoEntityRights` instead.
    #[error("permission denied")]
    PermissionDenied,

    /// The caller holds no rights at all on the entity.
    #[error("no {kind} rights for {unique_id}")]
    NoEntityRights {
        kind: EntityKind,
        unique_id: String,
    },

    /// The caller holds some rights on the entity, but not all required.
    #[error("insufficient {kind} rights for {unique_id}: missing {}", format_rights(.missing))]
    InsufficientEntityRights {
        kind: EntityKind,
        unique_id: String,
        missing: Vec<Right>,
    },

    /// The caller holds no universal rights.
    #[error("no universal rights")]
    NoUniversalRights,

    /// The caller holds some universal rights, but not all required.
    #[error("insufficient universal rights: missing {}", format_rights(.missing))]
    InsufficientUniversalRights { missing: Vec<Right> },

    /// The caller is not an admin.
    #[error("no admin rights")]
    NoAdmin,

    /// No connection to the identity registry.
    #[error("identity registry unavailable: {message}")]
    Unavailable { message: String },

    /// The caller's context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The caller's deadline expired.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Any other identity registry failure.
    #[error("identity registry error: {message}")]
    Registry { message: String },
}

fn format_rights(rights: &[Right]) -> String {
    rights
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl RightsError {
    /// Whether this error belongs to the permission-denied class for
    /// transport propagation.
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            RightsError::PermissionDenied
                | RightsError::NoEntityRights { .. }
                | RightsError::InsufficientEntityRights { .. }
                | RightsError::NoUniversalRights
                | RightsError::InsufficientUniversalRights { .. }
                | RightsError::NoAdmin
        )
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, RightsError::Unauthenticated)
    }

    /// Whether this error means the caller (or the fetch) went away.
    ///
    /// Results carrying a cancellation are never cached as valid.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            RightsError::Cancelled | RightsError::DeadlineExceeded
        )
    }

    pub fn registry(message: impl Into<String>) -> Self {
        RightsError::Registry {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        RightsError::Unavailable {
            message: message.into(),
        }
    }
}

/// Result alias for rights operations.
pub type RightsResult<T> = Result<T, RightsError>;
