use std::sync::Arc;
use std::task::{Context, Poll};

use http::{Request, Response};
use http_body::Body as HttpBody;
use polis::{Dispatcher, DomainFilter};
use polis_core::{Environment, ModificationTracker, PolicyRequest};
use polis_http::PolicyBody;
use tower::Service;

use crate::error::ServiceError;
use crate::future::PolicyFuture;

/// Service created by [`PolicyLayer`](crate::PolicyLayer).
///
/// For every request it creates a fresh [`Dispatcher`] and
/// [`ModificationTracker`], stores both in the request extensions and applies
/// the collected policies once the wrapped service responded.
pub struct PolicyService<S> {
    upstream: S,
    filter: Arc<DomainFilter>,
    environment: Environment,
}

impl<S> PolicyService<S> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, filter: Arc<DomainFilter>, environment: Environment) -> Self {
        PolicyService {
            upstream,
            filter,
            environment,
        }
    }
}

impl<S> Clone for PolicyService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            filter: self.filter.clone(),
            environment: self.environment,
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PolicyService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: HttpBody,
{
    type Response = Response<PolicyBody<ResBody>>;
    type Error = ServiceError<S::Error>;
    type Future = PolicyFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx).map_err(ServiceError::Upstream)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let dispatcher = Dispatcher::with_filter(self.filter.clone());
        let tracker = ModificationTracker::new();

        let (mut parts, body) = req.into_parts();
        let request = PolicyRequest::snapshot(&parts)
            .with_environment(self.environment)
            .with_modification(tracker.clone());
        parts.extensions.insert(dispatcher.clone());
        parts.extensions.insert(tracker);

        let inner = self.upstream.call(Request::from_parts(parts, body));
        PolicyFuture::new(inner, dispatcher, request)
    }
}
