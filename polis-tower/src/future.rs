use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::Utc;
use futures::ready;
use http::Response;
use http_body::Body as HttpBody;
use pin_project::pin_project;
use polis::Dispatcher;
use polis_core::PolicyRequest;
use polis_http::{PolicedResponse, PolicyBody};
use tracing::debug;

use crate::error::ServiceError;

/// Future returned by [`PolicyService`](crate::PolicyService).
///
/// Waits for the wrapped service, then applies the request's policies to its
/// response. When the wrapped service fails, the registrations are discarded.
#[pin_project]
pub struct PolicyFuture<F> {
    #[pin]
    inner: F,
    dispatcher: Dispatcher,
    request: PolicyRequest,
}

impl<F> PolicyFuture<F> {
    /// Wraps the wrapped service's response future.
    pub fn new(inner: F, dispatcher: Dispatcher, request: PolicyRequest) -> Self {
        Self {
            inner,
            dispatcher,
            request,
        }
    }
}

impl<F, ResBody, E> Future for PolicyFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: HttpBody,
{
    type Output = Result<Response<PolicyBody<ResBody>>, ServiceError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let response = match ready!(this.inner.poll(cx)) {
            Ok(response) => response,
            Err(err) => {
                debug!("upstream failed, discarding policies");
                this.dispatcher.discard();
                return Poll::Ready(Err(ServiceError::Upstream(err)));
            }
        };

        let mut policed = PolicedResponse::from_response(response);
        this.request.set_now(Utc::now());
        let result = this
            .dispatcher
            .apply_all(this.request, &mut policed)
            .map(|_| policed.into_response())
            .map_err(ServiceError::Policy);

        Poll::Ready(result)
    }
}
