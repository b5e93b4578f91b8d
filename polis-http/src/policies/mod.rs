//! Concrete response policies.
//!
//! - [`CachingPolicy`] - authoritative cache headers and `304` handling
//! - [`CustomHeaderPolicy`] - fixed header list; empty values remove headers

pub mod caching;
mod custom_header;

pub use caching::{CachingPolicy, DEFAULT_VARY};
pub use custom_header::CustomHeaderPolicy;
