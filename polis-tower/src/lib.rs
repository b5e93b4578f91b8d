//! Tower middleware integration for Polis.
//!
//! This crate provides two layers:
//!
//! - **[`PolicyLayer`]**: the policy stage. Wrap the whole application with it.
//!   For every request it creates a [`Dispatcher`](polis::Dispatcher) and a
//!   [`ModificationTracker`](polis_core::ModificationTracker), stores both in
//!   the request extensions and, once the inner service responded, applies
//!   every registered policy in order.
//!
//! - **[`ControllerLayer`]**: wraps the handler of one controller and
//!   registers the controller's declared policies with the request's
//!   dispatcher before the handler runs.
//!
//! # Quick Start
//!
//! ```
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use polis::{Controller, Originator, PolicyApplicator, PolicyEntry, PolicySet};
//! use polis_http::CachingPolicy;
//! use polis_tower::{ControllerLayer, PolicyLayer};
//! use tower::{ServiceBuilder, ServiceExt, service_fn};
//!
//! struct HomePage {
//!     applicators: Vec<PolicyApplicator>,
//! }
//!
//! impl Originator for HomePage {}
//!
//! impl Controller for HomePage {
//!     fn applicators(&self) -> &[PolicyApplicator] {
//!         &self.applicators
//!     }
//! }
//!
//! let home = HomePage {
//!     applicators: vec![
//!         PolicySet::new()
//!             .with("caching", PolicyEntry::new(CachingPolicy::new().cache_age(300)))
//!             .into(),
//!     ],
//! };
//!
//! let service = ServiceBuilder::new()
//!     .layer(PolicyLayer::builder().ignore_domains(["*.internal"])?.build())
//!     .layer(ControllerLayer::new(home))
//!     .service(service_fn(|_req: Request<()>| async {
//!         Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"Hello"))))
//!     }));
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let response = service.oneshot(Request::new(())).await.unwrap();
//! assert_eq!(
//!     response.headers()["cache-control"],
//!     "max-age=300, must-revalidate, no-transform"
//! );
//! # });
//! # Ok::<(), polis::PatternError>(())
//! ```
//!
//! # Errors
//!
//! [`PolicyService`] reports failures as [`ServiceError`]: either the inner
//! service failed (no policy is applied) or a policy failed.

mod controller;
mod error;
mod future;
mod layer;
mod service;

pub use controller::{ControllerLayer, ControllerService};
pub use error::ServiceError;
pub use future::PolicyFuture;
pub use layer::{PolicyLayer, PolicyLayerBuilder};
pub use service::PolicyService;
