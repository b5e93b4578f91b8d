//! Originators and their optional override capabilities.
//!
//! An originator is the object (usually a controller) on whose behalf a policy
//! was registered. Policies never depend on a concrete originator type; instead
//! they ask the originator for optional capabilities:
//!
//! - [`CacheAgeProvider`] - overrides the max-age a caching policy would emit
//! - [`VaryProvider`] - overrides the `Vary` list
//! - [`ModificationProvider`] - supplies the last modification timestamp
//!
//! An originator that does not expose a capability simply keeps the policy's
//! configured behavior. Absence is never an error.
//!
//! # Example
//!
//! ```
//! use polis_core::{CacheAgeProvider, Originator};
//!
//! struct ArticleController {
//!     editor_max_age: Option<u64>,
//! }
//!
//! impl CacheAgeProvider for ArticleController {
//!     fn cache_age(&self, _current: u64) -> Option<u64> {
//!         self.editor_max_age
//!     }
//! }
//!
//! impl Originator for ArticleController {
//!     fn label(&self) -> &str {
//!         "ArticleController"
//!     }
//!
//!     fn as_cache_age_provider(&self) -> Option<&dyn CacheAgeProvider> {
//!         Some(self)
//!     }
//! }
//!
//! let controller = ArticleController { editor_max_age: Some(120) };
//! let provider = controller.as_cache_age_provider().unwrap();
//! assert_eq!(provider.cache_age(0), Some(120));
//! assert!(controller.as_vary_provider().is_none());
//! ```

use chrono::{DateTime, Utc};

/// Supplies a custom max-age in seconds.
pub trait CacheAgeProvider {
    /// Returns the max-age to use, given the policy's `current` value.
    ///
    /// `None` keeps `current`.
    fn cache_age(&self, current: u64) -> Option<u64>;
}

/// Supplies a custom `Vary` list.
pub trait VaryProvider {
    /// Returns a comma-separated list of header names, given the policy's
    /// `current` list.
    ///
    /// `None` keeps `current`.
    fn vary(&self, current: &str) -> Option<String>;
}

/// Supplies the moment the policed content last changed.
pub trait ModificationProvider {
    /// Returns the modification timestamp, if known.
    fn modification_timestamp(&self) -> Option<DateTime<Utc>>;
}

/// The object on whose behalf a policy is applied.
///
/// Every capability accessor defaults to `None`, so implementing this trait
/// for a plain controller takes no code beyond an optional [`label`](Self::label).
pub trait Originator: Send + Sync {
    /// Human-readable name used in logs.
    fn label(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Returns the max-age capability, if this originator has one.
    fn as_cache_age_provider(&self) -> Option<&dyn CacheAgeProvider> {
        None
    }

    /// Returns the vary capability, if this originator has one.
    fn as_vary_provider(&self) -> Option<&dyn VaryProvider> {
        None
    }

    /// Returns the modification timestamp capability, if this originator has one.
    fn as_modification_provider(&self) -> Option<&dyn ModificationProvider> {
        None
    }
}

/// An originator without any capability.
impl Originator for () {
    fn label(&self) -> &str {
        "anonymous"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stamped(i64);

    impl ModificationProvider for Stamped {
        fn modification_timestamp(&self) -> Option<DateTime<Utc>> {
            DateTime::from_timestamp(self.0, 0)
        }
    }

    impl Originator for Stamped {
        fn as_modification_provider(&self) -> Option<&dyn ModificationProvider> {
            Some(self)
        }
    }

    #[test]
    fn unit_originator_has_no_capabilities() {
        let originator: &dyn Originator = &();
        assert_eq!(originator.label(), "anonymous");
        assert!(originator.as_cache_age_provider().is_none());
        assert!(originator.as_vary_provider().is_none());
        assert!(originator.as_modification_provider().is_none());
    }

    #[test]
    fn capability_is_reachable_through_trait_object() {
        let originator: &dyn Originator = &Stamped(5000);
        let timestamp = originator
            .as_modification_provider()
            .and_then(|provider| provider.modification_timestamp());
        assert_eq!(timestamp.map(|t| t.timestamp()), Some(5000));
        assert!(originator.label().ends_with("Stamped"));
    }
}
