#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Attaching declared policies to controllers.
///
/// Provides [`PolicyApplicator`] and the [`Controller`] trait, and
/// [`init_controller`] which registers a controller's policies with a
/// [`Dispatcher`].
pub mod applicator;

/// Request-scoped registry that applies registered policies in order.
pub mod dispatcher;

/// Ignore-domain patterns.
pub mod domain;

/// Error types for ignore-domain patterns.
pub mod error;

/// Metrics for policy application.
///
/// When the `metrics` feature is enabled, this module provides counters for:
/// - Policies applied
/// - Requests skipped because of an ignored domain
/// - Failed policies
/// - Responses turned into `304 Not Modified`
pub mod metrics;

pub use applicator::{Controller, PolicyApplicator, init_controller};
pub use dispatcher::{ApplyOutcome, Dispatcher, Registration};
pub use domain::{DomainFilter, IgnorePattern};
pub use error::PatternError;

pub use polis_core::{
    CacheAgeProvider, DetachedResponse, Environment, ModificationProvider, ModificationTracker,
    Originator, Policy, PolicyEntry, PolicyError, PolicyRequest, PolicyResponse,
    PolicyResponseExt, PolicySet, VaryProvider,
};
