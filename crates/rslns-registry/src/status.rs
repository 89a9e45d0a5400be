//! Mapping between gRPC status codes and the rights error taxonomy.

use tonic::{Code, Status};

use rslns_domain::RightsError;

/// Classifies a registry status into the rights error taxonomy.
///
/// The three classes the callers discriminate (unauthenticated,
/// permission-denied, unavailable) map one-to-one; cancellation and
/// deadline codes keep their meaning so the cache never stores them as
/// valid; everything else is an opaque registry error.
pub fn classify_status(status: &Status) -> RightsError {
    match status.code() {
        Code::Unauthenticated => RightsError::Unauthenticated,
        Code::PermissionDenied => RightsError::PermissionDenied,
        Code::Unavailable => RightsError::unavailable(status.message()),
        Code::Cancelled => RightsError::Cancelled,
        Code::DeadlineExceeded => RightsError::DeadlineExceeded,
        _ => RightsError::registry(status.message()),
    }
}

/// Renders a rights error as the status returned to the platform's own
/// callers.
///
/// Every domain-level denial (`No*` / `Insufficient*`) propagates as
/// permission-denied, keeping the missing-rights detail in the message.
pub fn status_from_error(err: &RightsError) -> Status {
    match err {
        RightsError::Unauthenticated => Status::unauthenticated(err.to_string()),
        RightsError::PermissionDenied
        | RightsError::NoEntityRights { .. }
        | RightsError::InsufficientEntityRights { .. }
        | RightsError::NoUniversalRights
        | RightsError::InsufficientUniversalRights { .. }
        | RightsError::NoAdmin => Status::permission_denied(err.to_string()),
        RightsError::Unavailable { .. } => Status::unavailable(err.to_string()),
        RightsError::Cancelled => Status::cancelled(err.to_string()),
        RightsError::DeadlineExceeded => Status::deadline_exceeded(err.to_string()),
        RightsError::Registry { .. } => Status::unknown(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rslns_domain::{EntityKind, Right};

    #[test]
    fn status_codes_map_onto_the_taxonomy() {
        assert!(classify_status(&Status::unauthenticated("no key")).is_unauthenticated());
        assert!(matches!(
            classify_status(&Status::permission_denied("denied")),
            RightsError::PermissionDenied
        ));
        assert!(matches!(
            classify_status(&Status::unavailable("draining")),
            RightsError::Unavailable { .. }
        ));
        assert!(classify_status(&Status::cancelled("gone")).is_cancellation());
        assert!(classify_status(&Status::deadline_exceeded("late")).is_cancellation());
        assert!(matches!(
            classify_status(&Status::internal("boom")),
            RightsError::Registry { .. }
        ));
    }

    #[test]
    fn domain_denials_propagate_as_permission_denied() {
        let err = RightsError::InsufficientEntityRights {
            kind: EntityKind::Application,
            unique_id: "application:foo".to_string(),
            missing: vec![Right::ApplicationSettingsBasic],
        };
        let status = status_from_error(&err);
        assert_eq!(status.code(), Code::PermissionDenied);
        assert!(status.message().contains("APPLICATION_SETTINGS_BASIC"));
    }

    #[test]
    fn classification_roundtrips_the_wire_classes() {
        for err in [
            RightsError::Unauthenticated,
            RightsError::PermissionDenied,
            RightsError::Cancelled,
            RightsError::DeadlineExceeded,
        ] {
            let classified = classify_status(&status_from_error(&err));
            assert_eq!(
                std::mem::discriminant(&classified),
                std::mem::discriminant(&err)
            );
        }
    }
}
