#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Response body that policies can replace.
pub mod body;

/// `Cache-Control` directive sets.
pub mod cache_control;

/// Request-extension accessors for the per-request policy context.
pub mod extensions;

/// HTTP-date, `Vary` and `ETag` helpers.
pub mod headers;

/// Reusable originator capabilities.
pub mod originators;

/// Concrete response policies.
pub mod policies;

/// HTTP response wrapper implementing `PolicyResponse`.
pub mod response;

pub use body::PolicyBody;
pub use cache_control::CacheControl;
pub use extensions::PolicyContextExt;
pub use originators::PageMaxAge;
pub use policies::{CachingPolicy, CustomHeaderPolicy, DEFAULT_VARY};
pub use response::PolicedResponse;
