//! The policy contract and ordered policy declarations.
//!
//! This module provides:
//!
//! - [`Policy`] - a unit of response mutation applied at the end of the pipeline
//! - [`PolicyEntry`] - a declared policy, or the [`Noop`](PolicyEntry::Noop)
//!   sentinel that cancels an inherited one
//! - [`PolicySet`] - an ordered list of named entries with override-by-name
//!   semantics
//!
//! ## Ordering
//!
//! Policies declared on a controller are applied so that the **first** entry
//! of a [`PolicySet`] is applied **last** and therefore wins on overlapping
//! headers. The reversal itself happens when the set is registered (see
//! `polis::PolicyApplicator`); the set keeps the declared order.
//!
//! ## Overrides
//!
//! A derived declaration inherits its parent's set and may replace entries by
//! name, keeping their position, or cancel them with [`PolicyEntry::Noop`]:
//!
//! ```
//! use polis_core::{PolicyEntry, PolicySet};
//! # use polis_core::{Originator, Policy, PolicyError, PolicyRequest, PolicyResponse};
//! # #[derive(Debug)]
//! # struct Headers;
//! # impl Policy for Headers {
//! #     fn apply_to_response(
//! #         &self,
//! #         _: &dyn Originator,
//! #         _: &PolicyRequest,
//! #         _: &mut dyn PolicyResponse,
//! #     ) -> Result<(), PolicyError> {
//! #         Ok(())
//! #     }
//! # }
//!
//! let mut base = PolicySet::new();
//! base.insert("caching", PolicyEntry::new(Headers));
//! base.insert("headers", PolicyEntry::new(Headers));
//!
//! let mut derived = PolicySet::new();
//! derived.cancel("caching");
//!
//! let effective = derived.inherit(&base);
//! assert_eq!(effective.names().collect::<Vec<_>>(), ["caching", "headers"]);
//! assert!(effective.get("caching").unwrap().is_noop());
//! ```

use std::fmt::{self, Debug};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::PolicyError;
use crate::originator::Originator;
use crate::request::PolicyRequest;
use crate::response::PolicyResponse;

/// A unit of response mutation.
///
/// Policies are constructed once and shared between requests, possibly
/// concurrently. Everything that varies per request arrives as an argument;
/// implementations must not keep mutable per-call state.
///
/// Implementations should be idempotent: applying the same policy twice with
/// identical inputs yields the same headers. Headers owned by a policy are
/// *set*, never appended, and list-valued headers are de-duplicated.
pub trait Policy: Debug + Send + Sync {
    /// Mutates `response` on behalf of `originator`.
    ///
    /// Side effects must stay confined to `response`.
    fn apply_to_response(
        &self,
        originator: &dyn Originator,
        request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError>;

    /// Name used in logs and error reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T> Policy for Arc<T>
where
    T: Policy + ?Sized,
{
    fn apply_to_response(
        &self,
        originator: &dyn Originator,
        request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        self.as_ref().apply_to_response(originator, request, response)
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }
}

impl<T> Policy for Box<T>
where
    T: Policy + ?Sized,
{
    fn apply_to_response(
        &self,
        originator: &dyn Originator,
        request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        self.as_ref().apply_to_response(originator, request, response)
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }
}

/// A declared policy.
#[derive(Clone)]
pub enum PolicyEntry {
    /// Does nothing. Used to cancel an inherited policy.
    Noop,
    /// A shared policy instance.
    Apply(Arc<dyn Policy>),
}

impl PolicyEntry {
    /// Wraps a policy into a shareable entry.
    pub fn new<P>(policy: P) -> Self
    where
        P: Policy + 'static,
    {
        PolicyEntry::Apply(Arc::new(policy))
    }

    /// Returns `true` for the [`Noop`](PolicyEntry::Noop) sentinel.
    pub fn is_noop(&self) -> bool {
        matches!(self, PolicyEntry::Noop)
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        match self {
            PolicyEntry::Noop => "noop",
            PolicyEntry::Apply(policy) => policy.name(),
        }
    }

    /// Applies the entry; the sentinel leaves the response untouched.
    pub fn apply_to_response(
        &self,
        originator: &dyn Originator,
        request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        match self {
            PolicyEntry::Noop => Ok(()),
            PolicyEntry::Apply(policy) => policy.apply_to_response(originator, request, response),
        }
    }
}

impl Debug for PolicyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyEntry::Noop => f.write_str("Noop"),
            PolicyEntry::Apply(policy) => f.debug_tuple("Apply").field(policy).finish(),
        }
    }
}

impl From<Arc<dyn Policy>> for PolicyEntry {
    fn from(policy: Arc<dyn Policy>) -> Self {
        PolicyEntry::Apply(policy)
    }
}

/// Ordered, named policy declarations.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    entries: Vec<(SmolStr, PolicyEntry)>,
}

impl PolicySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry at the end, or replaces the same-named entry in place.
    pub fn insert(&mut self, name: impl Into<SmolStr>, entry: PolicyEntry) -> &mut Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((name, entry)),
        }
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<SmolStr>, entry: PolicyEntry) -> Self {
        self.insert(name, entry);
        self
    }

    /// Overrides the named entry with [`PolicyEntry::Noop`].
    pub fn cancel(&mut self, name: impl Into<SmolStr>) -> &mut Self {
        self.insert(name, PolicyEntry::Noop)
    }

    /// Removes the named entry, returning it.
    pub fn remove(&mut self, name: &str) -> Option<PolicyEntry> {
        let index = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns the named entry.
    pub fn get(&self, name: &str) -> Option<&PolicyEntry> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, entry)| entry)
    }

    /// Returns a set holding `parent`'s entries, overridden by this set's
    /// same-named entries, followed by this set's new entries.
    pub fn inherit(&self, parent: &PolicySet) -> PolicySet {
        let mut merged = parent.clone();
        for (name, entry) in &self.entries {
            merged.insert(name.clone(), entry.clone());
        }
        merged
    }

    /// Entry names in declared order.
    pub fn names(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Entries in declared order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &PolicyEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N> FromIterator<(N, PolicyEntry)> for PolicySet
where
    N: Into<SmolStr>,
{
    fn from_iter<I: IntoIterator<Item = (N, PolicyEntry)>>(iter: I) -> Self {
        let mut set = PolicySet::new();
        for (name, entry) in iter {
            set.insert(name, entry);
        }
        set
    }
}
