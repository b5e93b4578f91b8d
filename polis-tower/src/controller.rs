//! Controller initialization as a Tower layer.
//!
//! [`ControllerLayer`] wraps the handler of one controller. Before the
//! handler runs, the controller's declared policies are registered with the
//! request's dispatcher, the way a controller registers them right after it
//! is initialized.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Request;
use polis::{Controller, Dispatcher, init_controller};
use tower::{Layer, Service};
use tracing::warn;

/// Registers the policies of `C` for every request passing through.
pub struct ControllerLayer<C> {
    controller: Arc<C>,
}

impl<C> ControllerLayer<C> {
    /// Creates a layer for `controller`.
    pub fn new(controller: C) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }

    /// Creates a layer for a shared controller.
    pub fn from_arc(controller: Arc<C>) -> Self {
        Self { controller }
    }
}

impl<C> Clone for ControllerLayer<C> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<C> fmt::Debug for ControllerLayer<C>
where
    C: Controller,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerLayer")
            .field("controller", &self.controller.label())
            .finish()
    }
}

impl<S, C> Layer<S> for ControllerLayer<C> {
    type Service = ControllerService<S, C>;

    fn layer(&self, upstream: S) -> Self::Service {
        ControllerService {
            upstream,
            controller: Arc::clone(&self.controller),
        }
    }
}

/// Service created by [`ControllerLayer`].
pub struct ControllerService<S, C> {
    upstream: S,
    controller: Arc<C>,
}

impl<S, C> Clone for ControllerService<S, C>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<S, C, ReqBody> Service<Request<ReqBody>> for ControllerService<S, C>
where
    S: Service<Request<ReqBody>>,
    C: Controller + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // without the policy layer there is nothing to register with
        if let Some(dispatcher) = req.extensions().get::<Dispatcher>()
            && let Err(err) = init_controller(&self.controller, dispatcher)
        {
            warn!(
                controller = self.controller.label(),
                error = %err,
                "policy registration rejected"
            );
        }
        self.upstream.call(req)
    }
}
