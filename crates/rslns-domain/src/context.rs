//! Request-scoped context.
//!
//! The platform's RPC layer builds one [`Context`] per inbound call and
//! threads it through every layer below. It carries the caller's opaque
//! credentials, a cancellation token, an optional deadline, and a typed
//! extension map through which the rights layers attach their payloads
//! (fetcher handle, preloaded rights map, memoization cache).
//!
//! Derivation is immutable, in the manner of a call chain: every `with_*`
//! returns a new `Context`, and cloning is cheap.

use std::time::Instant;

use http::Extensions;
use tokio_util::sync::CancellationToken;

use crate::error::{RightsError, RightsResult};

/// Opaque caller credentials.
///
/// The pair is never interpreted by this subsystem; it is used as a cache
/// key and forwarded verbatim to the identity registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub auth_type: String,
    pub auth_value: String,
}

impl Credentials {
    pub fn new(auth_type: impl Into<String>, auth_value: impl Into<String>) -> Self {
        Self {
            auth_type: auth_type.into(),
            auth_value: auth_value.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new("Bearer", token)
    }
}

/// Per-call context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    credentials: Option<Credentials>,
    correlation_id: Option<String>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    extensions: Extensions,
}

impl Context {
    /// A root context with no credentials, cancellation or deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Attaches a typed value to the context.
    ///
    /// One value per type; inserting replaces any previous value of the
    /// same type.
    pub fn with_value<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Reads a typed value previously attached with [`Context::with_value`].
    pub fn value<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// A context for work that must outlive this caller.
    ///
    /// Credentials, correlation id and extensions are kept; the
    /// cancellation token is replaced by `cancel` (typically a process
    /// shutdown token) and the deadline is cleared.
    pub fn detached(&self, cancel: CancellationToken) -> Self {
        Self {
            credentials: self.credentials.clone(),
            correlation_id: self.correlation_id.clone(),
            cancel,
            deadline: None,
            extensions: self.extensions.clone(),
        }
    }

    /// Whether the context has been cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes when the context is cancelled or the deadline passes.
    ///
    /// Pends forever on a context with neither; intended for `select!`.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep_until(deadline.into()) => {}
            },
            None => self.cancel.cancelled().await,
        }
    }

    /// The error describing why this context is no longer live.
    pub fn cancellation_error(&self) -> RightsError {
        if self.cancel.is_cancelled() {
            RightsError::Cancelled
        } else {
            RightsError::DeadlineExceeded
        }
    }

    /// Errors out if the context is no longer live.
    pub fn check_cancelled(&self) -> RightsResult<()> {
        if self.is_cancelled() {
            Err(self.cancellation_error())
        } else {
            Ok(())
        }
    }
}
