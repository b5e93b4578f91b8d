use polis_core::PolicyError;
use thiserror::Error;

/// Error returned by [`PolicyService`](crate::PolicyService).
///
/// Handler failures and policy failures travel on the same error channel, so
/// the hosting pipeline handles both the way it handles any other failure.
#[derive(Debug, Error)]
pub enum ServiceError<E> {
    /// The wrapped service failed. No policy was applied.
    #[error("upstream service failed: {0}")]
    Upstream(#[source] E),

    /// A policy failed. Policies applied before it keep their mutations but
    /// the response is not delivered.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl<E> ServiceError<E> {
    /// Returns the upstream error, if the wrapped service failed.
    pub fn into_upstream(self) -> Option<E> {
        match self {
            ServiceError::Upstream(err) => Some(err),
            ServiceError::Policy(_) => None,
        }
    }
}
