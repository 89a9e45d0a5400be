//! Rights hook metrics.
//!
//! Two counter vectors, both labeled `{entity_kind, outcome}`:
//!
//! - `rights_hook_requests_total` - per-identifier preload requests
//! - `rights_hook_fetches_total` - underlying fetches issued by the cache
//!
//! The `zero` outcome marks a successful fetch that returned an empty
//! rights set, which usually points at misconfigured credentials.

use rslns_domain::{AuthInfo, Rights, RightsError, RightsResult};

/// Counter of per-identifier rights requests seen by the preload hook.
pub const REQUESTS_TOTAL: &str = "rights_hook_requests_total";

/// Counter of underlying fetches issued to the identity registry.
pub const FETCHES_TOTAL: &str = "rights_hook_fetches_total";

/// Outcome label values.
pub mod outcome {
    pub const OK: &str = "ok";
    pub const ZERO: &str = "zero";
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const ERROR: &str = "error";
}

/// Entity-kind label value for auth-info operations, which are not tied
/// to a single entity.
pub const AUTH_INFO_KIND: &str = "auth_info";

/// Registers metric descriptions with the installed recorder.
///
/// Call once at process startup; recording works without it, this only
/// improves exposition output.
pub fn describe_metrics() {
    metrics::describe_counter!(
        REQUESTS_TOTAL,
        "Rights requests made by the preload hook, by entity kind and outcome"
    );
    metrics::describe_counter!(
        FETCHES_TOTAL,
        "Rights fetches issued to the identity registry, by entity kind and outcome"
    );
}

/// Records one preload request.
pub fn record_request(entity_kind: &'static str, outcome: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "entity_kind" => entity_kind, "outcome" => outcome)
        .increment(1);
}

/// Records one underlying fetch.
pub fn record_fetch(entity_kind: &'static str, outcome: &'static str) {
    metrics::counter!(FETCHES_TOTAL, "entity_kind" => entity_kind, "outcome" => outcome)
        .increment(1);
}

/// Values that can be classified as `zero` for metric purposes.
pub(crate) trait OutcomeValue {
    fn is_zero(&self) -> bool;
}

impl OutcomeValue for Rights {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl OutcomeValue for AuthInfo {
    fn is_zero(&self) -> bool {
        self.universal_rights.is_empty() && !self.is_admin
    }
}

/// Maps a fetch result onto its outcome label.
pub(crate) fn outcome_for<T: OutcomeValue>(result: &RightsResult<T>) -> &'static str {
    match result {
        Ok(value) if value.is_zero() => outcome::ZERO,
        Ok(_) => outcome::OK,
        Err(RightsError::Unauthenticated) => outcome::UNAUTHENTICATED,
        Err(RightsError::PermissionDenied) => outcome::PERMISSION_DENIED,
        Err(_) => outcome::ERROR,
    }
}
