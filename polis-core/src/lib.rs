#![warn(missing_docs)]
//! # polis-core
//!
//! Core contracts for per-controller HTTP response policies.
//!
//! This crate defines the protocol-level abstractions the rest of Polis builds
//! on. It has no knowledge of Tower, routing or any particular body type.
//!
//! ## Building blocks
//!
//! - [`Policy`] - mutates an outgoing response at the end of the pipeline
//! - [`PolicyEntry`] / [`PolicySet`] - declared policies, with the
//!   [`Noop`](PolicyEntry::Noop) sentinel and override-by-name semantics
//! - [`Originator`] - the controller a policy runs for, exposing optional
//!   capabilities ([`CacheAgeProvider`], [`VaryProvider`],
//!   [`ModificationProvider`])
//! - [`PolicyRequest`] - read-only view of the inbound request
//! - [`PolicyResponse`] - mutable view of the outgoing response
//! - [`ModificationTracker`] - per-request "last modified" accumulator
//!
//! Errors are reported as [`PolicyError`].

pub mod error;
pub mod modification;
pub mod originator;
pub mod policy;
pub mod request;
pub mod response;

pub use error::{BoxError, PolicyError};
pub use modification::ModificationTracker;
pub use originator::{CacheAgeProvider, ModificationProvider, Originator, VaryProvider};
pub use policy::{Policy, PolicyEntry, PolicySet};
pub use request::{Environment, PolicyRequest};
pub use response::{DetachedResponse, PolicyResponse, PolicyResponseExt};
#[doc(hidden)]
pub use smol_str::SmolStr;
