//! Access to the per-request policy context stored in request extensions.
//!
//! The policy layer stores a [`Dispatcher`] and a [`ModificationTracker`] in
//! the extensions of every request it handles. Handlers and data-access code
//! reach them through [`PolicyContextExt`]:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use http::Request;
//! use polis_http::PolicyContextExt;
//! use polis_core::ModificationTracker;
//!
//! let mut request = Request::new(());
//! request.extensions_mut().insert(ModificationTracker::new());
//!
//! request.touch(Utc.timestamp_opt(180, 0).unwrap());
//! assert_eq!(
//!     request.modification_tracker().and_then(ModificationTracker::latest),
//!     Some(Utc.timestamp_opt(180, 0).unwrap()),
//! );
//! ```

use chrono::{DateTime, Utc};
use http::{Extensions, Request, request::Parts};
use polis::Dispatcher;
use polis_core::ModificationTracker;

/// Reads the policy context from request extensions.
pub trait PolicyContextExt {
    /// The request's extensions.
    fn policy_extensions(&self) -> &Extensions;

    /// The dispatcher collecting this request's policies, if the request
    /// passes through the policy layer.
    fn dispatcher(&self) -> Option<&Dispatcher> {
        self.policy_extensions().get::<Dispatcher>()
    }

    /// The request's modification feed, if any.
    fn modification_tracker(&self) -> Option<&ModificationTracker> {
        self.policy_extensions().get::<ModificationTracker>()
    }

    /// Records that data last modified at `timestamp` was read while handling
    /// the request. Does nothing outside the policy layer.
    fn touch(&self, timestamp: DateTime<Utc>) {
        if let Some(tracker) = self.modification_tracker() {
            tracker.touch(timestamp);
        }
    }
}

impl<B> PolicyContextExt for Request<B> {
    fn policy_extensions(&self) -> &Extensions {
        self.extensions()
    }
}

impl PolicyContextExt for Parts {
    fn policy_extensions(&self) -> &Extensions {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_context_is_not_an_error() {
        let request = Request::new(());
        assert!(request.dispatcher().is_none());
        request.touch(Utc::now());
        assert!(request.modification_tracker().is_none());
    }

    #[test]
    fn parts_share_the_dispatcher() {
        let dispatcher = Dispatcher::new();
        let mut request = Request::new(());
        request.extensions_mut().insert(dispatcher.clone());
        let (parts, ()) = request.into_parts();

        parts
            .dispatcher()
            .unwrap()
            .register(std::sync::Arc::new(()), polis_core::PolicyEntry::Noop)
            .unwrap();
        assert_eq!(dispatcher.len(), 1);
    }
}
