//! `Cache-Control` values emitted by the caching policy.

use std::fmt;

use http::HeaderValue;

/// The directive set a caching policy settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheControl {
    /// Shared caches may keep the response for the given number of seconds.
    MaxAge(u64),
    /// Responses must be revalidated on every use.
    NoCache,
    /// Responses must not be stored at all.
    NoStore,
}

impl CacheControl {
    /// Directive set for a resolved cache age.
    pub fn for_age(cache_age: u64, no_store: bool) -> Self {
        match (cache_age, no_store) {
            (_, true) => CacheControl::NoStore,
            (0, false) => CacheControl::NoCache,
            (age, false) => CacheControl::MaxAge(age),
        }
    }

    /// Effective `max-age` in seconds.
    pub fn max_age(&self) -> u64 {
        match self {
            CacheControl::MaxAge(age) => *age,
            CacheControl::NoCache | CacheControl::NoStore => 0,
        }
    }

    /// Returns `true` when clients and proxies may reuse the response.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, CacheControl::MaxAge(_))
    }

    /// Returns `true` for the `no-store` directive set.
    pub fn is_no_store(&self) -> bool {
        matches!(self, CacheControl::NoStore)
    }

    /// Renders the header value.
    pub fn to_header_value(&self) -> HeaderValue {
        match self {
            CacheControl::NoCache => {
                HeaderValue::from_static("no-cache, max-age=0, must-revalidate, no-transform")
            }
            CacheControl::NoStore => HeaderValue::from_static(
                "no-store, no-cache, max-age=0, must-revalidate, no-transform",
            ),
            CacheControl::MaxAge(_) => HeaderValue::from_maybe_shared(self.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("no-cache")),
        }
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheControl::MaxAge(age) => {
                write!(f, "max-age={age}, must-revalidate, no-transform")
            }
            CacheControl::NoCache => f.write_str("no-cache, max-age=0, must-revalidate, no-transform"),
            CacheControl::NoStore => {
                f.write_str("no-store, no-cache, max-age=0, must-revalidate, no-transform")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_directives() {
        assert_eq!(
            CacheControl::for_age(999, false).to_header_value(),
            "max-age=999, must-revalidate, no-transform"
        );
        assert_eq!(
            CacheControl::for_age(0, false).to_header_value(),
            "no-cache, max-age=0, must-revalidate, no-transform"
        );
        assert_eq!(
            CacheControl::for_age(999, true).to_header_value(),
            "no-store, no-cache, max-age=0, must-revalidate, no-transform"
        );
    }

    #[test]
    fn max_age_is_zero_unless_cacheable() {
        assert_eq!(CacheControl::MaxAge(60).max_age(), 60);
        assert_eq!(CacheControl::NoStore.max_age(), 0);
        assert!(!CacheControl::NoCache.is_cacheable());
    }
}
