//! Error types for policy registration and application.

use http::header::{InvalidHeaderName, InvalidHeaderValue};
use thiserror::Error;

/// Boxed error produced by user-defined policies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for policy operations.
///
/// Errors fall into two groups:
///
/// - **Registration errors** ([`RegistrationClosed`](Self::RegistrationClosed),
///   [`AlreadyApplied`](Self::AlreadyApplied)) report a dispatcher used outside
///   of its request lifecycle.
/// - **Application errors** ([`Failed`](Self::Failed)) abort the remaining
///   policies of a request and are surfaced to the hosting pipeline.
///
/// Header construction errors are configuration errors and are reported when a
/// policy is built, never while it is applied.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A policy was registered after the dispatcher applied its registrations.
    #[error("policy registration is closed: registrations were already applied")]
    RegistrationClosed,

    /// `apply_all` was called twice without clearing the dispatcher.
    #[error("registered policies were already applied to this request")]
    AlreadyApplied,

    /// The header name is not a valid HTTP header name.
    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String, #[source] InvalidHeaderName),

    /// The header value contains bytes HTTP does not allow.
    #[error("invalid value for header `{0}`")]
    InvalidHeaderValue(String, #[source] InvalidHeaderValue),

    /// A policy failed while mutating the response.
    #[error("policy `{policy}` failed")]
    Failed {
        /// Name of the failing policy.
        policy: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },
}

impl PolicyError {
    /// Wraps an arbitrary error raised by the named policy.
    pub fn failed(policy: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PolicyError::Failed {
            policy: policy.into(),
            source: source.into(),
        }
    }
}
