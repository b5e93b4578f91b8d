//! Request-scoped policy registry.
//!
//! A [`Dispatcher`] collects `(originator, policy)` registrations while the
//! request is being handled and applies all of them, in registration order,
//! once the inner handler produced a response.
//!
//! ```text
//!   register ──► Collecting ──apply_all──► Applied
//!                    ▲                        │
//!                    └──────── clear ─────────┘
//! ```
//!
//! Handles are cheap to clone and share the same registration sequence, so a
//! handle can be stored in request extensions and reached from controllers.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use polis_core::{Originator, PolicyEntry, PolicyError, PolicyRequest, PolicyResponse};
use tracing::{Level, debug, error, field, span, trace};

use crate::domain::DomainFilter;

/// A single queued application.
#[derive(Clone)]
pub struct Registration {
    /// Whose behalf the policy runs on.
    pub originator: Arc<dyn Originator>,
    /// The policy to apply.
    pub entry: PolicyEntry,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("originator", &self.originator.label())
            .field("entry", &self.entry)
            .finish()
    }
}

/// Result of [`Dispatcher::apply_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The request host is ignored; the response was left untouched.
    Ignored,
    /// Every registration was applied. Holds their number.
    Applied(usize),
}

impl ApplyOutcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Ignored => "ignored",
            ApplyOutcome::Applied(_) => "applied",
        }
    }
}

#[derive(Debug)]
enum State {
    Collecting(Vec<Registration>),
    Applied,
}

struct Inner {
    state: Mutex<State>,
    filter: Arc<DomainFilter>,
}

/// Collects policy registrations for one request and applies them.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a dispatcher that ignores no host.
    pub fn new() -> Self {
        Self::with_filter(Arc::new(DomainFilter::empty()))
    }

    /// Creates a dispatcher that skips hosts matched by `filter`.
    pub fn with_filter(filter: Arc<DomainFilter>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Collecting(Vec::new())),
                filter,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `entry` to be applied on behalf of `originator`.
    ///
    /// Fails with [`PolicyError::RegistrationClosed`] once the registrations
    /// have been applied.
    pub fn register(
        &self,
        originator: Arc<dyn Originator>,
        entry: PolicyEntry,
    ) -> Result<(), PolicyError> {
        match &mut *self.state() {
            State::Collecting(registrations) => {
                trace!(
                    policy = entry.name(),
                    originator = originator.label(),
                    "policy registered"
                );
                registrations.push(Registration { originator, entry });
                Ok(())
            }
            State::Applied => Err(PolicyError::RegistrationClosed),
        }
    }

    /// Drops every registration and reopens the dispatcher.
    pub fn clear(&self) {
        *self.state() = State::Collecting(Vec::new());
    }

    /// Drops the registrations of an aborted request without applying them.
    pub fn discard(&self) {
        let mut state = self.state();
        if let State::Collecting(registrations) = &mut *state {
            if !registrations.is_empty() {
                debug!(
                    registered = registrations.len(),
                    "discarding policy registrations"
                );
            }
            registrations.clear();
        }
    }

    /// Snapshot of the queued registrations, in application order.
    pub fn registrations(&self) -> Vec<Registration> {
        match &*self.state() {
            State::Collecting(registrations) => registrations.clone(),
            State::Applied => Vec::new(),
        }
    }

    /// Number of queued registrations.
    pub fn len(&self) -> usize {
        match &*self.state() {
            State::Collecting(registrations) => registrations.len(),
            State::Applied => 0,
        }
    }

    /// Returns `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`apply_all`](Self::apply_all) ran.
    pub fn is_applied(&self) -> bool {
        matches!(&*self.state(), State::Applied)
    }

    /// The host filter this dispatcher consults.
    pub fn domain_filter(&self) -> &DomainFilter {
        &self.inner.filter
    }

    /// Returns `true` when `host` matches an ignore-domain pattern.
    pub fn is_ignored_domain(&self, host: &str) -> bool {
        self.inner.filter.is_ignored(host)
    }

    /// Applies every registration to `response`, in registration order.
    ///
    /// Requests without a host are never ignored. Application stops at the
    /// first failing policy; mutations made by earlier policies stay in place.
    pub fn apply_all(
        &self,
        request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<ApplyOutcome, PolicyError> {
        let registrations = match mem::replace(&mut *self.state(), State::Applied) {
            State::Collecting(registrations) => registrations,
            State::Applied => return Err(PolicyError::AlreadyApplied),
        };

        let span = span!(
            Level::DEBUG,
            "polis.dispatch",
            host = request.host().unwrap_or_default(),
            registered = registrations.len(),
            outcome = field::Empty,
        );
        let _entered = span.enter();

        if let Some(host) = request.host()
            && self.is_ignored_domain(host)
        {
            debug!(host, "host is ignored, skipping policies");
            span.record("outcome", ApplyOutcome::Ignored.as_str());
            crate::metrics::record_ignored();
            return Ok(ApplyOutcome::Ignored);
        }

        for registration in &registrations {
            let policy = registration.entry.name();
            let originator = registration.originator.label();
            let policy_span = span!(Level::TRACE, "polis.policy", policy, originator);
            let _policy_entered = policy_span.enter();

            if let Err(err) = registration.entry.apply_to_response(
                registration.originator.as_ref(),
                request,
                response,
            ) {
                error!(policy, originator, error = %err, "policy application failed");
                span.record("outcome", "failed");
                crate::metrics::record_failure(policy);
                return Err(err);
            }
        }

        let outcome = ApplyOutcome::Applied(registrations.len());
        span.record("outcome", outcome.as_str());
        crate::metrics::record_applied(registrations.len());
        Ok(outcome)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &*self.state())
            .field("filter", &self.inner.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderName;
    use http::{HeaderValue, Request};
    use polis_core::{DetachedResponse, Policy, PolicyResponseExt};
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Append(&'static str);

    impl Policy for Append {
        fn apply_to_response(
            &self,
            _originator: &dyn Originator,
            _request: &PolicyRequest,
            response: &mut dyn PolicyResponse,
        ) -> Result<(), PolicyError> {
            let current = response.header("x-trail").unwrap_or_default().to_owned();
            let value = HeaderValue::from_str(&format!("{current}{}", self.0))
                .map_err(|err| PolicyError::InvalidHeaderValue(self.0.to_owned(), err))?;
            response.set_header(HeaderName::from_static("x-trail"), value);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Policy for Broken {
        fn apply_to_response(
            &self,
            _originator: &dyn Originator,
            _request: &PolicyRequest,
            _response: &mut dyn PolicyResponse,
        ) -> Result<(), PolicyError> {
            Err(PolicyError::failed("broken", "boom"))
        }
    }

    fn anonymous() -> Arc<dyn Originator> {
        Arc::new(())
    }

    fn request(host: &str) -> PolicyRequest {
        PolicyRequest::from_request(Request::builder().header("host", host).body(()).unwrap())
    }

    #[test]
    fn applies_in_registration_order() {
        let dispatcher = Dispatcher::new();
        for step in ["a", "b", "c"] {
            dispatcher
                .register(anonymous(), PolicyEntry::new(Append(step)))
                .unwrap();
        }

        let mut response = DetachedResponse::new();
        let outcome = dispatcher
            .apply_all(&request("example.com"), &mut response)
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied(3));
        assert_eq!(response.header("x-trail"), Some("abc"));
    }

    #[test]
    fn ignored_host_is_left_untouched() {
        let filter = DomainFilter::new(["*.internal"]).unwrap();
        let dispatcher = Dispatcher::with_filter(Arc::new(filter));
        dispatcher
            .register(anonymous(), PolicyEntry::new(Append("a")))
            .unwrap();

        let mut response = DetachedResponse::new();
        let outcome = dispatcher
            .apply_all(&request("cms.internal:8080"), &mut response)
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert!(response.headers.is_empty());
    }

    #[test]
    fn request_without_host_is_never_ignored() {
        let dispatcher = Dispatcher::with_filter(Arc::new(DomainFilter::new(["/.*/"]).unwrap()));
        dispatcher
            .register(anonymous(), PolicyEntry::new(Append("a")))
            .unwrap();

        let mut response = DetachedResponse::new();
        let outcome = dispatcher
            .apply_all(
                &PolicyRequest::from_request(Request::new(())),
                &mut response,
            )
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied(1));
    }

    #[test]
    fn fails_fast_and_keeps_earlier_mutations() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .register(anonymous(), PolicyEntry::new(Append("a")))
            .unwrap();
        dispatcher
            .register(anonymous(), PolicyEntry::new(Broken))
            .unwrap();
        dispatcher
            .register(anonymous(), PolicyEntry::new(Append("c")))
            .unwrap();

        let mut response = DetachedResponse::new();
        let err = dispatcher
            .apply_all(&request("example.com"), &mut response)
            .unwrap_err();

        assert!(matches!(err, PolicyError::Failed { .. }));
        assert_eq!(response.header("x-trail"), Some("a"));
    }

    #[test]
    fn applied_dispatcher_rejects_registrations_until_cleared() {
        let dispatcher = Dispatcher::new();
        let mut response = DetachedResponse::new();
        dispatcher
            .apply_all(&request("example.com"), &mut response)
            .unwrap();

        assert!(dispatcher.is_applied());
        assert!(matches!(
            dispatcher.register(anonymous(), PolicyEntry::Noop),
            Err(PolicyError::RegistrationClosed)
        ));
        assert!(matches!(
            dispatcher.apply_all(&request("example.com"), &mut response),
            Err(PolicyError::AlreadyApplied)
        ));

        dispatcher.clear();
        dispatcher.register(anonymous(), PolicyEntry::Noop).unwrap();
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn discard_drops_pending_registrations() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.clone();
        handle
            .register(anonymous(), PolicyEntry::new(Append("a")))
            .unwrap();
        assert_eq!(dispatcher.len(), 1);

        dispatcher.discard();

        assert!(handle.is_empty());
        assert!(!dispatcher.is_applied());
    }
}
