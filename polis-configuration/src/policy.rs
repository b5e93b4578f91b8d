//! Policy definitions.
//!
//! ```yaml
//! general:
//!   type: Caching
//!   cache_age: 15m
//!   vary: "Cookie, X-Forwarded-Protocol, Accept"
//! headers:
//!   type: CustomHeader
//!   headers:
//!     X-Frame-Options: DENY
//!     Vary: ""
//! off:
//!   type: Noop
//! ```

use std::time::Duration;

use indexmap::IndexMap;
use polis_core::PolicyEntry;
use polis_http::{CachingPolicy, CustomHeaderPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Max-age given either as seconds or as a human-readable duration.
///
/// ```yaml
/// cache_age: 900
/// cache_age: 15m
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheAge {
    /// Whole seconds.
    Seconds(u64),
    /// Human-readable duration, truncated to whole seconds.
    Duration(#[serde(with = "humantime_serde")] Duration),
}

impl CacheAge {
    /// The max-age in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            CacheAge::Seconds(seconds) => *seconds,
            CacheAge::Duration(duration) => duration.as_secs(),
        }
    }
}

impl Default for CacheAge {
    fn default() -> Self {
        CacheAge::Seconds(0)
    }
}

fn default_true() -> bool {
    true
}

/// Settings of a [`CachingPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingDefinition {
    /// Max-age used unless the controller overrides it.
    #[serde(default)]
    pub cache_age: CacheAge,
    /// Vary list used unless the controller overrides it.
    #[serde(default)]
    pub vary: Option<String>,
    /// Overrides the document-wide `disable_cache_age_in_dev` flag.
    #[serde(default)]
    pub disable_cache_age_in_dev: Option<bool>,
    /// Whether `X-Requested-With: XMLHttpRequest` responses may be cached.
    #[serde(default = "default_true")]
    pub cache_ajax_requests: bool,
    /// Whether `If-Modified-Since` may trigger `304`.
    #[serde(default = "default_true")]
    pub legacy_if_modified_since: bool,
    /// Emit `no-store`.
    #[serde(default)]
    pub no_store: bool,
}

impl CachingDefinition {
    /// Builds the policy; `disable_cache_age_in_dev` is the document-wide
    /// default.
    pub fn into_policy(self, disable_cache_age_in_dev: bool) -> CachingPolicy {
        let policy = CachingPolicy::new()
            .cache_age(self.cache_age.as_secs())
            .disable_cache_age_in_dev(
                self.disable_cache_age_in_dev
                    .unwrap_or(disable_cache_age_in_dev),
            )
            .cache_ajax_requests(self.cache_ajax_requests)
            .legacy_if_modified_since(self.legacy_if_modified_since)
            .no_store(self.no_store);
        match self.vary {
            Some(vary) => policy.vary(vary),
            None => policy,
        }
    }
}

/// Settings of a [`CustomHeaderPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHeaderDefinition {
    /// Header names and values; an empty value removes the header.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

/// A named policy definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PolicyDefinition {
    /// [`CachingPolicy`].
    Caching(CachingDefinition),
    /// [`CustomHeaderPolicy`].
    CustomHeader(CustomHeaderDefinition),
    /// Cancels an inherited policy.
    Noop,
}

impl PolicyDefinition {
    /// Builds the policy entry.
    pub fn into_entry(
        self,
        name: &str,
        disable_cache_age_in_dev: bool,
    ) -> Result<PolicyEntry, ConfigError> {
        match self {
            PolicyDefinition::Caching(definition) => Ok(PolicyEntry::new(
                definition.into_policy(disable_cache_age_in_dev),
            )),
            PolicyDefinition::CustomHeader(definition) => {
                let policy = definition.headers.iter().try_fold(
                    CustomHeaderPolicy::new(),
                    |policy, (header, value)| policy.try_header(header, value),
                );
                policy
                    .map(PolicyEntry::new)
                    .map_err(|source| ConfigError::InvalidPolicy {
                        name: name.to_owned(),
                        source,
                    })
            }
            PolicyDefinition::Noop => Ok(PolicyEntry::Noop),
        }
    }
}
